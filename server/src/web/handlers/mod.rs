// storefront/src/web/handlers/mod.rs

pub mod order_handlers;
pub mod return_handlers;

use crate::errors::{AppError, Result as AppResult};
use crate::state::AppState;
use actix_web::error::{JsonPayloadError, QueryPayloadError};
use actix_web::HttpRequest;
use storeflow::{AtomicContext, ContextData, PipelineResult};
use tracing::warn;

/// Runs the workflow registered for `TData` atomically. A stopped run is a server fault: no
/// workflow step stops on purpose.
pub(crate) async fn run_workflow<TData: AtomicContext>(
  app_state: &AppState,
  ctx_data: ContextData<TData>,
) -> AppResult<()> {
  match app_state.workflows.run_atomic(ctx_data).await? {
    PipelineResult::Completed => Ok(()),
    PipelineResult::Stopped => {
      warn!(
        context_type = %std::any::type_name::<TData>(),
        "Workflow was halted by a handler."
      );
      Err(AppError::Internal("Workflow was halted before completion".to_string()))
    }
  }
}

/// Maps malformed or mistyped JSON bodies to the regular 400 error body.
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
  AppError::Validation(format!("Invalid request body: {}", err)).into()
}

pub fn query_error_handler(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
  AppError::Validation(format!("Invalid query string: {}", err)).into()
}
