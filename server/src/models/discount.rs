// storefront/src/models/discount.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Discount {
  pub id: i64,
  pub code: String,
  pub percentage: i32, // 1..=100
  pub expiration_date: DateTime<Utc>,
}

impl Discount {
  /// Usable while `expiration_date >= now`.
  pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
    self.expiration_date >= now
  }
}
