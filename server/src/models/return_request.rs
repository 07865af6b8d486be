// storefront/src/models/return_request.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "return_status")]
pub enum ReturnStatus {
  Pending,
  Approved,
  Rejected,
}

impl ReturnStatus {
  pub fn is_resolved(self) -> bool {
    self != ReturnStatus::Pending
  }
}

impl fmt::Display for ReturnStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      ReturnStatus::Pending => "Pending",
      ReturnStatus::Approved => "Approved",
      ReturnStatus::Rejected => "Rejected",
    };
    f.write_str(s)
  }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ReturnRequest {
  pub id: i64,
  pub user_id: i64,
  pub order_id: i64,
  pub return_reason: String,
  pub status: ReturnStatus,
  pub total_returned_quantity: i32,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ReturnItem {
  pub id: i64,
  pub return_id: i64,
  pub product_id: i64,
  pub quantity: i32,
  pub ordered_item_id: i64,
  pub reason: String,
  pub status: ReturnStatus,
  pub created_at: DateTime<Utc>,
}
