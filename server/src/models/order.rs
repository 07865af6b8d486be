// storefront/src/models/order.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use std::fmt;

use super::order_item::OrderDetailItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "order_status")]
pub enum OrderStatus {
  Pending,
  Delivered,
  Cancelled,
}

impl OrderStatus {
  /// `Pending -> Delivered` and `Pending -> Cancelled`; both targets are terminal.
  pub fn can_transition_to(self, next: OrderStatus) -> bool {
    matches!(
      (self, next),
      (OrderStatus::Pending, OrderStatus::Delivered) | (OrderStatus::Pending, OrderStatus::Cancelled)
    )
  }
}

impl fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      OrderStatus::Pending => "Pending",
      OrderStatus::Delivered => "Delivered",
      OrderStatus::Cancelled => "Cancelled",
    };
    f.write_str(s)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
  Paid,
  Pending,
  Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "payment_method", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
  Upi,
  Card,
  Cod,
  NetBanking,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Order {
  pub id: i64,
  pub user_id: i64,
  pub address_id: i64,
  pub discount_id: Option<i64>,
  pub total_amount: Decimal,
  pub discount_amount: Decimal,
  /// Fixed at creation: `total_amount - discount_amount`.
  pub net_amount: Decimal,
  pub status: OrderStatus,
  pub payment_status: PaymentStatus,
  pub payment_method: PaymentMethod,
  pub transaction_id: Option<String>,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderSummary {
  pub order_id: i64,
  pub net_amount: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderDetails {
  pub order: Order,
  pub items: Vec<OrderDetailItem>,
}
