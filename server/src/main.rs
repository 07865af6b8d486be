// storefront/src/main.rs

use actix_web::{web as actix_data, App, HttpServer};
use std::sync::Arc;
use storefront::config::AppConfig;
use storefront::web::configure_app_routes;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
  let app_config = Arc::new(AppConfig::from_env()?);
  storefront::init_tracing(app_config.log_format)?;
  tracing::info!("Starting storefront server...");

  // A failed connection ends the process; the supervisor restarts it.
  let store = storefront::build_store(&app_config).await.map_err(|e| {
    tracing::error!(error = %e, "Failed to initialise the store.");
    e
  })?;

  let app_state = storefront::build_state(store.clone(), app_config.clone());
  tracing::info!("Workflow pipelines registered.");

  let server_address = app_config.bind_address();
  tracing::info!("Binding server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await?;

  tracing::info!("Server stopped; closing store.");
  store.close().await;
  Ok(())
}
