// storefront/src/models/order_item.rs

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

/// One product line of a placed order. `price` is the unit price at purchase time.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderedItem {
  pub id: i64,
  pub order_id: i64,
  pub product_id: i64,
  pub quantity: i32,
  pub price: Decimal,
  /// Units still returnable, `0 <= current_quantity <= quantity`.
  pub current_quantity: i32,
}

/// Ordered item joined with its product name, as shown on the order details endpoint.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderDetailItem {
  pub ordered_item_id: i64,
  pub product_id: i64,
  pub product_name: String,
  pub quantity: i32,
  pub price: Decimal,
  pub current_quantity: i32,
}
