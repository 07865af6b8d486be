// storefront/src/lib.rs

//! Order lifecycle service: order creation, cancellation and status updates, and return requests,
//! each run as an atomic `storeflow` workflow over an injected `Store`.

pub mod config;
pub mod errors;
pub mod models;
pub mod pipelines;
pub mod services;
pub mod state;
pub mod store;
pub mod web;

use crate::config::{AppConfig, LogFormat, StoreBackend};
use crate::errors::{AppError, Result as AppResult};
use crate::state::AppState;
use crate::store::{MemoryStore, PgStore, Store};
use crate::web::extractors::{GatewayPrincipalResolver, PrincipalResolver};
use std::sync::Arc;
use storeflow::Registry;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. `RUST_LOG` overrides the default `info` level.
pub fn init_tracing(format: LogFormat) -> anyhow::Result<()> {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_span_events(FmtSpan::CLOSE);
  match format {
    LogFormat::Json => builder.json().try_init(),
    LogFormat::Pretty => builder.try_init(),
  }
  .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {}", e))
}

/// Connects the configured backend, applying migrations or demo data when asked to.
pub async fn build_store(config: &AppConfig) -> AppResult<Arc<dyn Store>> {
  match config.store_backend {
    StoreBackend::Postgres => {
      let store = PgStore::connect(config).await?;
      if config.run_migrations {
        store.run_migrations().await?;
      }
      if config.seed_db {
        tracing::warn!("SEED_DB only applies to the memory backend; ignoring.");
      }
      Ok(Arc::new(store))
    }
    StoreBackend::Memory => {
      let store = MemoryStore::new();
      if config.seed_db {
        store.seed_demo().await;
      }
      tracing::info!("Using in-memory store.");
      Ok(Arc::new(store))
    }
  }
}

/// Registry with every workflow pipeline registered.
pub fn build_workflows() -> Arc<Registry<AppError>> {
  let registry = Registry::<AppError>::new();
  pipelines::register_all_pipelines(&registry);
  Arc::new(registry)
}

pub fn build_state(store: Arc<dyn Store>, config: Arc<AppConfig>) -> AppState {
  let principals: Arc<dyn PrincipalResolver> = Arc::new(GatewayPrincipalResolver);
  AppState {
    store,
    workflows: build_workflows(),
    config,
    principals,
  }
}
