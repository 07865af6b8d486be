// storefront/src/errors.rs

use crate::models::{OrderStatus, ReturnStatus};
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use storeflow::FlowError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Authentication Failed: {0}")]
  Auth(String),

  #[error("Forbidden: {0}")]
  Forbidden(String),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("Cart not found or does not belong to this user")]
  CartNotFound,

  #[error("No items found in the cart")]
  EmptyCart,

  #[error("Order not found or does not belong to this user")]
  OrderNotFound,

  #[error("Return request not found")]
  ReturnNotFound,

  #[error("Not enough stock for product {product_id}: requested {requested}, available {available}")]
  InsufficientStock {
    product_id: i64,
    requested: i32,
    available: i32,
  },

  #[error("Invalid or expired discount")]
  InvalidOrExpiredDiscount,

  #[error("Order is already cancelled")]
  AlreadyCancelled,

  #[error("Order status cannot change from {from} to {to}")]
  InvalidStatusTransition { from: OrderStatus, to: OrderStatus },

  #[error("Order must be delivered before a return request can be created")]
  OrderNotDelivered,

  #[error("Returned quantity {requested} exceeds returnable quantity {returnable} for ordered item {ordered_item_id}")]
  ExceedsReturnableQuantity {
    ordered_item_id: i64,
    requested: i32,
    returnable: i32,
  },

  #[error("Invalid return item: {0}")]
  InvalidReturnItem(String),

  #[error("Return request is already {0}")]
  ReturnAlreadyResolved(ReturnStatus),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error("Workflow Error: {source}")]
  Workflow {
    #[from]
    source: FlowError,
  },

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

impl AppError {
  /// Stable machine-readable kind, sent as `code` in error bodies.
  pub fn code(&self) -> &'static str {
    match self {
      AppError::Validation(_) => "ValidationError",
      AppError::Auth(_) => "Unauthorized",
      AppError::Forbidden(_) => "Forbidden",
      AppError::NotFound(_) => "NotFound",
      AppError::CartNotFound => "CartNotFound",
      AppError::EmptyCart => "EmptyCart",
      AppError::OrderNotFound => "OrderNotFound",
      AppError::ReturnNotFound => "ReturnNotFound",
      AppError::InsufficientStock { .. } => "InsufficientStock",
      AppError::InvalidOrExpiredDiscount => "InvalidOrExpiredDiscount",
      AppError::AlreadyCancelled => "AlreadyCancelled",
      AppError::InvalidStatusTransition { .. } => "InvalidStatusTransition",
      AppError::OrderNotDelivered => "OrderNotDelivered",
      AppError::ExceedsReturnableQuantity { .. } => "ExceedsReturnableQuantity",
      AppError::InvalidReturnItem(_) => "InvalidReturnItem",
      AppError::ReturnAlreadyResolved(_) => "ReturnAlreadyResolved",
      AppError::Config(_) | AppError::Sqlx(_) | AppError::Workflow { .. } | AppError::Internal(_) => "InternalError",
    }
  }

  /// True for failures the client cannot fix by changing the request.
  pub fn is_internal(&self) -> bool {
    self.status_code() == StatusCode::INTERNAL_SERVER_ERROR
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Auth(_) => StatusCode::UNAUTHORIZED,
      AppError::Forbidden(_) => StatusCode::FORBIDDEN,
      AppError::NotFound(_) => StatusCode::NOT_FOUND,
      AppError::Config(_) | AppError::Sqlx(_) | AppError::Workflow { .. } | AppError::Internal(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
      _ => StatusCode::BAD_REQUEST,
    }
  }

  fn error_response(&self) -> HttpResponse {
    if self.is_internal() {
      tracing::error!(application_error = %self, "Responding with internal error");
      return HttpResponse::build(self.status_code())
        .json(json!({"error": "An internal error occurred", "code": self.code()}));
    }
    tracing::info!(application_error = %self, code = self.code(), "Responding with client error");
    HttpResponse::build(self.status_code()).json(json!({"error": self.to_string(), "code": self.code()}))
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
