// storefront/src/web/routes.rs

use crate::web::handlers::{json_error_handler, order_handlers, query_error_handler, return_handlers};
use actix_web::{web, HttpResponse};

async fn health_check_handler() -> HttpResponse {
  HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

/// Mounts every route under `/api`.
pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler));
  cfg.app_data(web::QueryConfig::default().error_handler(query_error_handler));
  cfg.service(
    web::scope("/api")
      .route("/health", web::get().to(health_check_handler))
      .service(
        web::scope("/orders")
          .route("", web::post().to(order_handlers::create_order_handler))
          .route("", web::get().to(order_handlers::all_orders_handler))
          .route("/user", web::get().to(order_handlers::user_orders_handler))
          .route("/details", web::get().to(order_handlers::order_details_handler))
          .route("/status", web::patch().to(order_handlers::update_order_status_handler))
          .route("/cancel", web::delete().to(order_handlers::cancel_order_handler)),
      )
      .service(
        web::scope("/returns")
          .route("", web::post().to(return_handlers::create_return_handler))
          .route("", web::get().to(return_handlers::all_returns_handler))
          .route("", web::patch().to(return_handlers::resolve_return_handler))
          .route("/details", web::get().to(return_handlers::return_details_handler))
          .route("/user", web::get().to(return_handlers::user_return_items_handler)),
      ),
  );
}
