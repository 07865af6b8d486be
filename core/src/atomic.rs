// storeflow/src/atomic.rs

//! All-or-nothing pipeline runs.
//!
//! A context type that owns a unit of work (typically a database transaction) exposes it through
//! `AtomicContext::boundary`. `run_atomic` commits that boundary only when the run completes and
//! rolls it back when a handler stops the pipeline or fails.

use crate::core::context_data::ContextData;
use crate::core::control::PipelineResult;
use crate::error::FlowError;
use crate::pipeline::definition::Pipeline;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{event, instrument, Level};

/// A unit of work that can be finalised exactly once.
#[async_trait]
pub trait TransactionBoundary: Send + Sync {
  async fn commit(&self) -> anyhow::Result<()>;
  async fn rollback(&self) -> anyhow::Result<()>;
}

/// Context data that carries its own transaction boundary.
pub trait AtomicContext: Send + Sync + 'static {
  fn boundary(&self) -> Arc<dyn TransactionBoundary>;
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: AtomicContext,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Runs the pipeline, then commits the context's boundary on `Completed` or rolls it back on
  /// `Stopped` or error.
  ///
  /// A failed commit surfaces as `FlowError::CommitFailed`. When a handler error triggered the
  /// rollback, that error is returned even if the rollback itself fails.
  #[instrument(
    name = "Pipeline::run_atomic",
    skip_all,
    fields(context_type = %std::any::type_name::<TData>())
  )]
  pub async fn run_atomic(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, Err> {
    let boundary = ctx_data.read_with(|ctx| ctx.boundary());
    let outcome = self.run(ctx_data).await;
    settle(boundary.as_ref(), outcome).await
  }
}

/// Finalises `boundary` according to the outcome of a run.
pub(crate) async fn settle<Err>(
  boundary: &dyn TransactionBoundary,
  outcome: Result<PipelineResult, Err>,
) -> Result<PipelineResult, Err>
where
  Err: std::error::Error + From<FlowError>,
{
  match outcome {
    Ok(PipelineResult::Completed) => {
      boundary.commit().await.map_err(|source| {
        event!(Level::ERROR, error = %source, "Commit failed.");
        Err::from(FlowError::CommitFailed { source })
      })?;
      event!(Level::DEBUG, "Committed.");
      Ok(PipelineResult::Completed)
    }
    Ok(PipelineResult::Stopped) => {
      boundary.rollback().await.map_err(|source| {
        event!(Level::ERROR, error = %source, "Rollback after stop failed.");
        Err::from(FlowError::RollbackFailed { source })
      })?;
      event!(Level::DEBUG, "Rolled back after stop.");
      Ok(PipelineResult::Stopped)
    }
    Err(err) => {
      if let Err(rollback_err) = boundary.rollback().await {
        event!(
          Level::ERROR,
          error = %rollback_err,
          original_error = %err,
          "Rollback after handler error failed."
        );
      } else {
        event!(Level::DEBUG, error = %err, "Rolled back after error.");
      }
      Err(err)
    }
  }
}
