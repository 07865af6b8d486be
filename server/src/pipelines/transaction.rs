// storefront/src/pipelines/transaction.rs

//! `TxScope`: the one database transaction a workflow run owns.

use crate::errors::Result as AppResult;
use crate::store::{Store, StoreTx};
use async_trait::async_trait;
use std::sync::Arc;
use storeflow::TransactionBoundary;
use tokio::sync::{Mutex, MutexGuard};

/// Shared handle to an open `StoreTx`.
///
/// Cloned into the workflow context; steps `acquire` it for the duration of their database work.
/// `storeflow` settles it through `TransactionBoundary` once the run ends.
#[derive(Clone)]
pub struct TxScope {
  inner: Arc<Mutex<Box<dyn StoreTx>>>,
}

impl TxScope {
  pub async fn begin(store: &dyn Store) -> AppResult<Self> {
    let tx = store.begin().await?;
    Ok(Self {
      inner: Arc::new(Mutex::new(tx)),
    })
  }

  pub async fn acquire(&self) -> MutexGuard<'_, Box<dyn StoreTx>> {
    self.inner.lock().await
  }

  pub fn boundary(&self) -> Arc<dyn TransactionBoundary> {
    Arc::new(self.clone())
  }
}

#[async_trait]
impl TransactionBoundary for TxScope {
  async fn commit(&self) -> anyhow::Result<()> {
    self.inner.lock().await.commit().await?;
    Ok(())
  }

  async fn rollback(&self) -> anyhow::Result<()> {
    self.inner.lock().await.rollback().await?;
    Ok(())
  }
}
