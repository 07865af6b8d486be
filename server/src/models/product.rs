// storefront/src/models/product.rs

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

/// A product row as the memory backend holds it. The Postgres store reads and updates `stock`
/// directly and never loads whole rows.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Product {
  pub id: i64,
  pub name: String,
  pub price: Decimal,
  pub stock: i32, // never negative, enforced by the stock ledger and a CHECK constraint
  pub category_id: Option<i64>,
}
