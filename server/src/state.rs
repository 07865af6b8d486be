// storefront/src/state.rs
use crate::config::AppConfig;
use crate::errors::AppError;
use crate::store::Store;
use crate::web::extractors::PrincipalResolver;
use std::sync::Arc;
use storeflow::Registry;

#[derive(Clone)]
pub struct AppState {
  pub store: Arc<dyn Store>,
  pub workflows: Arc<Registry<AppError>>,
  pub config: Arc<AppConfig>,
  pub principals: Arc<dyn PrincipalResolver>,
}
