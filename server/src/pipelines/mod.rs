// storefront/src/pipelines/mod.rs

//! Every order lifecycle workflow, as `storeflow` pipelines run atomically over one `TxScope`.

use crate::errors::AppError;
use storeflow::Registry;

pub mod contexts;
pub mod order_pipeline;
pub mod order_status_pipeline;
pub mod return_pipeline;
pub mod transaction;

pub use transaction::TxScope;

/// Registers all pipelines with the registry. Called once at startup.
pub fn register_all_pipelines(registry: &Registry<AppError>) {
  tracing::info!("Registering workflow pipelines...");

  order_pipeline::register_order_pipeline(registry);
  order_status_pipeline::register_order_status_pipeline(registry);
  return_pipeline::register_create_return_pipeline(registry);
  return_pipeline::register_resolve_return_pipeline(registry);

  tracing::info!("All workflow pipelines registered.");
}
