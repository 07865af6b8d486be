// storefront/src/store/mod.rs

//! Persistence seam.
//!
//! `Store` is the injected database component: it opens transactions and serves the read-only
//! endpoints. `StoreTx` is one open transaction; every `lock_*` read takes a row lock held until
//! `commit` or `rollback`.

pub mod memory;
pub mod postgres;

use crate::errors::Result as AppResult;
use crate::models::{
  Cart, CartItem, CartLine, Discount, Order, OrderDetails, OrderStatus, OrderSummary, OrderedItem, PaymentMethod,
  PaymentStatus, ReturnItem, ReturnRequest, ReturnStatus,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Clone)]
pub struct NewOrder {
  pub user_id: i64,
  pub address_id: i64,
  pub discount_id: Option<i64>,
  pub total_amount: Decimal,
  pub discount_amount: Decimal,
  pub net_amount: Decimal,
  pub payment_status: PaymentStatus,
  pub payment_method: PaymentMethod,
  pub transaction_id: Option<String>,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewOrderedItem {
  pub order_id: i64,
  pub product_id: i64,
  pub quantity: i32,
  pub price: Decimal,
}

#[derive(Debug, Clone)]
pub struct NewReturn {
  pub user_id: i64,
  pub order_id: i64,
  pub return_reason: String,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewReturnItem {
  pub return_id: i64,
  pub product_id: i64,
  pub quantity: i32,
  pub ordered_item_id: i64,
  pub reason: String,
  pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait Store: Send + Sync {
  async fn begin(&self) -> AppResult<Box<dyn StoreTx>>;

  async fn orders_for_user(&self, user_id: i64) -> AppResult<Vec<OrderSummary>>;
  /// `None` when the order does not exist or belongs to someone else.
  async fn order_details(&self, user_id: i64, order_id: i64) -> AppResult<Option<OrderDetails>>;
  async fn all_orders(&self) -> AppResult<Vec<Order>>;

  /// Newest first.
  async fn all_returns(&self) -> AppResult<Vec<ReturnRequest>>;
  async fn return_items(&self, return_id: i64) -> AppResult<Vec<ReturnItem>>;
  async fn return_items_for_user(&self, return_id: i64, user_id: i64) -> AppResult<Vec<ReturnItem>>;

  /// Drains connections at shutdown.
  async fn close(&self);
}

#[async_trait]
pub trait StoreTx: Send {
  // --- carts ---
  async fn lock_cart(&mut self, cart_id: i64) -> AppResult<Option<Cart>>;
  /// Locks the given cart items (unknown ids are absent from the result), ordered by id.
  async fn lock_cart_items(&mut self, cart_item_ids: &[i64]) -> AppResult<Vec<CartItem>>;
  /// Locks every item of the cart, ordered by id.
  async fn lock_items_of_cart(&mut self, cart_id: i64) -> AppResult<Vec<CartItem>>;
  /// Joins the given cart items with their products' current prices, ordered by cart item id.
  async fn price_cart_items(&mut self, cart_item_ids: &[i64]) -> AppResult<Vec<CartLine>>;
  async fn delete_cart_items(&mut self, cart_item_ids: &[i64]) -> AppResult<()>;
  /// Sets `total_amount` to the sum of the remaining items and returns it.
  async fn recompute_cart_total(&mut self, cart_id: i64) -> AppResult<Decimal>;

  // --- products ---
  /// Locked stock of a product, `None` when the product does not exist.
  async fn lock_product_stock(&mut self, product_id: i64) -> AppResult<Option<i32>>;
  /// Adds `delta` to the (already locked) product's stock and returns the new stock.
  async fn adjust_product_stock(&mut self, product_id: i64, delta: i32) -> AppResult<i32>;

  // --- discounts ---
  async fn find_discount_by_id(&mut self, discount_id: i64) -> AppResult<Option<Discount>>;
  async fn find_discount_by_code(&mut self, code: &str) -> AppResult<Option<Discount>>;

  // --- orders ---
  async fn insert_order(&mut self, order: NewOrder) -> AppResult<Order>;
  async fn lock_order(&mut self, order_id: i64) -> AppResult<Option<Order>>;
  async fn set_order_status(&mut self, order_id: i64, status: OrderStatus) -> AppResult<Order>;
  async fn insert_ordered_item(&mut self, item: NewOrderedItem) -> AppResult<OrderedItem>;
  /// Locks every ordered item of the order, ordered by id.
  async fn lock_ordered_items(&mut self, order_id: i64) -> AppResult<Vec<OrderedItem>>;
  /// Subtracts `quantity` from the ordered item's `current_quantity` and returns the new value.
  async fn consume_returnable(&mut self, ordered_item_id: i64, quantity: i32) -> AppResult<i32>;

  // --- returns ---
  async fn insert_return(&mut self, request: NewReturn) -> AppResult<ReturnRequest>;
  async fn insert_return_item(&mut self, item: NewReturnItem) -> AppResult<ReturnItem>;
  async fn lock_return(&mut self, return_id: i64) -> AppResult<Option<ReturnRequest>>;
  async fn items_of_return(&mut self, return_id: i64) -> AppResult<Vec<ReturnItem>>;
  /// Sets the status of the return and all its items, and records the returned quantity.
  async fn resolve_return(
    &mut self,
    return_id: i64,
    status: ReturnStatus,
    total_returned_quantity: i32,
  ) -> AppResult<ReturnRequest>;

  /// Both finish the transaction; any later call fails.
  async fn commit(&mut self) -> AppResult<()>;
  async fn rollback(&mut self) -> AppResult<()>;
}
