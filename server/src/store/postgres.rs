// storefront/src/store/postgres.rs

use super::{NewOrder, NewOrderedItem, NewReturn, NewReturnItem, Store, StoreTx};
use crate::config::AppConfig;
use crate::errors::{AppError, Result as AppResult};
use crate::models::{
  Cart, CartItem, CartLine, Discount, Order, OrderDetailItem, OrderDetails, OrderStatus, OrderSummary, OrderedItem,
  ReturnItem, ReturnRequest, ReturnStatus,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::{PgConnection, PgPoolOptions};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{error, info, instrument};

const ORDER_COLUMNS: &str = "id, user_id, address_id, discount_id, total_amount, discount_amount, net_amount, \
   status, payment_status, payment_method, transaction_id, created_at";
const ORDERED_ITEM_COLUMNS: &str = "id, order_id, product_id, quantity, price, current_quantity";
const RETURN_COLUMNS: &str = "id, user_id, order_id, return_reason, status, total_returned_quantity, created_at";
const RETURN_ITEM_COLUMNS: &str = "id, return_id, product_id, quantity, ordered_item_id, reason, status, created_at";

/// `Store` backed by a bounded Postgres pool.
#[derive(Clone)]
pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  #[instrument(name = "PgStore::connect", skip_all, fields(max_connections = config.db_max_connections))]
  pub async fn connect(config: &AppConfig) -> AppResult<Self> {
    let url = config
      .database_url
      .as_deref()
      .ok_or_else(|| AppError::Config("DATABASE_URL is required for the postgres backend".to_string()))?;
    let pool = PgPoolOptions::new()
      .max_connections(config.db_max_connections)
      .acquire_timeout(config.db_acquire_timeout)
      .connect(url)
      .await
      .map_err(|e| {
        error!(error = %e, "Failed to connect to the database.");
        AppError::Sqlx(e)
      })?;
    info!("Successfully connected to the database.");
    Ok(Self { pool })
  }

  /// Wraps a pool that is already connected and migrated.
  pub fn from_pool(pool: PgPool) -> Self {
    Self { pool }
  }

  pub async fn run_migrations(&self) -> AppResult<()> {
    sqlx::migrate!("./migrations")
      .run(&self.pool)
      .await
      .map_err(|e| AppError::Internal(format!("Migration failed: {}", e)))?;
    info!("Database migrations applied.");
    Ok(())
  }
}

#[async_trait]
impl Store for PgStore {
  async fn begin(&self) -> AppResult<Box<dyn StoreTx>> {
    let tx = self.pool.begin().await?;
    Ok(Box::new(PgTx { tx: Some(tx) }))
  }

  async fn orders_for_user(&self, user_id: i64) -> AppResult<Vec<OrderSummary>> {
    let rows = sqlx::query_as("SELECT id AS order_id, net_amount FROM orders WHERE user_id = $1 ORDER BY id")
      .bind(user_id)
      .fetch_all(&self.pool)
      .await?;
    Ok(rows)
  }

  async fn order_details(&self, user_id: i64, order_id: i64) -> AppResult<Option<OrderDetails>> {
    let order: Option<Order> =
      sqlx::query_as(&format!("SELECT {} FROM orders WHERE id = $1 AND user_id = $2", ORDER_COLUMNS))
        .bind(order_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
    let Some(order) = order else {
      return Ok(None);
    };
    let items: Vec<OrderDetailItem> = sqlx::query_as(
      "SELECT oi.id AS ordered_item_id, oi.product_id, p.name AS product_name, oi.quantity, oi.price, \
       oi.current_quantity \
       FROM ordered_items oi JOIN products p ON p.id = oi.product_id \
       WHERE oi.order_id = $1 ORDER BY oi.id",
    )
    .bind(order_id)
    .fetch_all(&self.pool)
    .await?;
    Ok(Some(OrderDetails { order, items }))
  }

  async fn all_orders(&self) -> AppResult<Vec<Order>> {
    let rows = sqlx::query_as(&format!("SELECT {} FROM orders ORDER BY id", ORDER_COLUMNS))
      .fetch_all(&self.pool)
      .await?;
    Ok(rows)
  }

  async fn all_returns(&self) -> AppResult<Vec<ReturnRequest>> {
    let rows = sqlx::query_as(&format!(
      "SELECT {} FROM returns ORDER BY created_at DESC, id DESC",
      RETURN_COLUMNS
    ))
    .fetch_all(&self.pool)
    .await?;
    Ok(rows)
  }

  async fn return_items(&self, return_id: i64) -> AppResult<Vec<ReturnItem>> {
    let rows = sqlx::query_as(&format!(
      "SELECT {} FROM return_items WHERE return_id = $1 ORDER BY id",
      RETURN_ITEM_COLUMNS
    ))
    .bind(return_id)
    .fetch_all(&self.pool)
    .await?;
    Ok(rows)
  }

  async fn return_items_for_user(&self, return_id: i64, user_id: i64) -> AppResult<Vec<ReturnItem>> {
    let rows = sqlx::query_as(
      "SELECT ri.id, ri.return_id, ri.product_id, ri.quantity, ri.ordered_item_id, ri.reason, ri.status, \
       ri.created_at \
       FROM return_items ri JOIN returns r ON r.id = ri.return_id \
       WHERE ri.return_id = $1 AND r.user_id = $2 ORDER BY ri.id",
    )
    .bind(return_id)
    .bind(user_id)
    .fetch_all(&self.pool)
    .await?;
    Ok(rows)
  }

  async fn close(&self) {
    self.pool.close().await;
    info!("Database pool closed.");
  }
}

/// One open Postgres transaction. `None` once committed or rolled back.
pub struct PgTx {
  tx: Option<Transaction<'static, Postgres>>,
}

impl PgTx {
  fn conn(&mut self) -> AppResult<&mut PgConnection> {
    self
      .tx
      .as_deref_mut()
      .ok_or_else(|| AppError::Internal("Transaction already finished".to_string()))
  }

  fn take(&mut self) -> AppResult<Transaction<'static, Postgres>> {
    self
      .tx
      .take()
      .ok_or_else(|| AppError::Internal("Transaction already finished".to_string()))
  }
}

#[async_trait]
impl StoreTx for PgTx {
  async fn lock_cart(&mut self, cart_id: i64) -> AppResult<Option<Cart>> {
    let row = sqlx::query_as("SELECT id, user_id, total_amount FROM carts WHERE id = $1 FOR UPDATE")
      .bind(cart_id)
      .fetch_optional(self.conn()?)
      .await?;
    Ok(row)
  }

  async fn lock_cart_items(&mut self, cart_item_ids: &[i64]) -> AppResult<Vec<CartItem>> {
    let rows = sqlx::query_as(
      "SELECT id, cart_id, product_id, quantity FROM cart_items WHERE id = ANY($1) ORDER BY id FOR UPDATE",
    )
    .bind(cart_item_ids)
    .fetch_all(self.conn()?)
    .await?;
    Ok(rows)
  }

  async fn lock_items_of_cart(&mut self, cart_id: i64) -> AppResult<Vec<CartItem>> {
    let rows = sqlx::query_as(
      "SELECT id, cart_id, product_id, quantity FROM cart_items WHERE cart_id = $1 ORDER BY id FOR UPDATE",
    )
    .bind(cart_id)
    .fetch_all(self.conn()?)
    .await?;
    Ok(rows)
  }

  async fn price_cart_items(&mut self, cart_item_ids: &[i64]) -> AppResult<Vec<CartLine>> {
    let rows = sqlx::query_as(
      "SELECT ci.id AS cart_item_id, ci.cart_id, ci.product_id, ci.quantity, p.price AS unit_price \
       FROM cart_items ci JOIN products p ON p.id = ci.product_id \
       WHERE ci.id = ANY($1) ORDER BY ci.id",
    )
    .bind(cart_item_ids)
    .fetch_all(self.conn()?)
    .await?;
    Ok(rows)
  }

  async fn delete_cart_items(&mut self, cart_item_ids: &[i64]) -> AppResult<()> {
    sqlx::query("DELETE FROM cart_items WHERE id = ANY($1)")
      .bind(cart_item_ids)
      .execute(self.conn()?)
      .await?;
    Ok(())
  }

  async fn recompute_cart_total(&mut self, cart_id: i64) -> AppResult<Decimal> {
    let total = sqlx::query_scalar(
      "UPDATE carts SET total_amount = COALESCE(( \
         SELECT SUM(ci.quantity * p.price) FROM cart_items ci JOIN products p ON p.id = ci.product_id \
         WHERE ci.cart_id = $1), 0) \
       WHERE id = $1 RETURNING total_amount",
    )
    .bind(cart_id)
    .fetch_one(self.conn()?)
    .await?;
    Ok(total)
  }

  async fn lock_product_stock(&mut self, product_id: i64) -> AppResult<Option<i32>> {
    let stock = sqlx::query_scalar("SELECT stock FROM products WHERE id = $1 FOR UPDATE")
      .bind(product_id)
      .fetch_optional(self.conn()?)
      .await?;
    Ok(stock)
  }

  async fn adjust_product_stock(&mut self, product_id: i64, delta: i32) -> AppResult<i32> {
    let stock = sqlx::query_scalar("UPDATE products SET stock = stock + $2 WHERE id = $1 RETURNING stock")
      .bind(product_id)
      .bind(delta)
      .fetch_one(self.conn()?)
      .await?;
    Ok(stock)
  }

  async fn find_discount_by_id(&mut self, discount_id: i64) -> AppResult<Option<Discount>> {
    let row = sqlx::query_as("SELECT id, code, percentage, expiration_date FROM discounts WHERE id = $1")
      .bind(discount_id)
      .fetch_optional(self.conn()?)
      .await?;
    Ok(row)
  }

  async fn find_discount_by_code(&mut self, code: &str) -> AppResult<Option<Discount>> {
    let row = sqlx::query_as("SELECT id, code, percentage, expiration_date FROM discounts WHERE code = $1")
      .bind(code)
      .fetch_optional(self.conn()?)
      .await?;
    Ok(row)
  }

  async fn insert_order(&mut self, order: NewOrder) -> AppResult<Order> {
    let row = sqlx::query_as(&format!(
      "INSERT INTO orders (user_id, address_id, discount_id, total_amount, discount_amount, net_amount, status, \
       payment_status, payment_method, transaction_id, created_at) \
       VALUES ($1, $2, $3, $4, $5, $6, 'Pending', $7, $8, $9, $10) RETURNING {}",
      ORDER_COLUMNS
    ))
    .bind(order.user_id)
    .bind(order.address_id)
    .bind(order.discount_id)
    .bind(order.total_amount)
    .bind(order.discount_amount)
    .bind(order.net_amount)
    .bind(order.payment_status)
    .bind(order.payment_method)
    .bind(order.transaction_id)
    .bind(order.created_at)
    .fetch_one(self.conn()?)
    .await?;
    Ok(row)
  }

  async fn lock_order(&mut self, order_id: i64) -> AppResult<Option<Order>> {
    let row = sqlx::query_as(&format!("SELECT {} FROM orders WHERE id = $1 FOR UPDATE", ORDER_COLUMNS))
      .bind(order_id)
      .fetch_optional(self.conn()?)
      .await?;
    Ok(row)
  }

  async fn set_order_status(&mut self, order_id: i64, status: OrderStatus) -> AppResult<Order> {
    let row = sqlx::query_as(&format!(
      "UPDATE orders SET status = $2 WHERE id = $1 RETURNING {}",
      ORDER_COLUMNS
    ))
    .bind(order_id)
    .bind(status)
    .fetch_one(self.conn()?)
    .await?;
    Ok(row)
  }

  async fn insert_ordered_item(&mut self, item: NewOrderedItem) -> AppResult<OrderedItem> {
    let row = sqlx::query_as(&format!(
      "INSERT INTO ordered_items (order_id, product_id, quantity, price, current_quantity) \
       VALUES ($1, $2, $3, $4, $3) RETURNING {}",
      ORDERED_ITEM_COLUMNS
    ))
    .bind(item.order_id)
    .bind(item.product_id)
    .bind(item.quantity)
    .bind(item.price)
    .fetch_one(self.conn()?)
    .await?;
    Ok(row)
  }

  async fn lock_ordered_items(&mut self, order_id: i64) -> AppResult<Vec<OrderedItem>> {
    let rows = sqlx::query_as(&format!(
      "SELECT {} FROM ordered_items WHERE order_id = $1 ORDER BY id FOR UPDATE",
      ORDERED_ITEM_COLUMNS
    ))
    .bind(order_id)
    .fetch_all(self.conn()?)
    .await?;
    Ok(rows)
  }

  async fn consume_returnable(&mut self, ordered_item_id: i64, quantity: i32) -> AppResult<i32> {
    let remaining = sqlx::query_scalar(
      "UPDATE ordered_items SET current_quantity = current_quantity - $2 WHERE id = $1 RETURNING current_quantity",
    )
    .bind(ordered_item_id)
    .bind(quantity)
    .fetch_one(self.conn()?)
    .await?;
    Ok(remaining)
  }

  async fn insert_return(&mut self, request: NewReturn) -> AppResult<ReturnRequest> {
    let row = sqlx::query_as(&format!(
      "INSERT INTO returns (user_id, order_id, return_reason, status, total_returned_quantity, created_at) \
       VALUES ($1, $2, $3, 'Pending', 0, $4) RETURNING {}",
      RETURN_COLUMNS
    ))
    .bind(request.user_id)
    .bind(request.order_id)
    .bind(request.return_reason)
    .bind(request.created_at)
    .fetch_one(self.conn()?)
    .await?;
    Ok(row)
  }

  async fn insert_return_item(&mut self, item: NewReturnItem) -> AppResult<ReturnItem> {
    let row = sqlx::query_as(&format!(
      "INSERT INTO return_items (return_id, product_id, quantity, ordered_item_id, reason, status, created_at) \
       VALUES ($1, $2, $3, $4, $5, 'Pending', $6) RETURNING {}",
      RETURN_ITEM_COLUMNS
    ))
    .bind(item.return_id)
    .bind(item.product_id)
    .bind(item.quantity)
    .bind(item.ordered_item_id)
    .bind(item.reason)
    .bind(item.created_at)
    .fetch_one(self.conn()?)
    .await?;
    Ok(row)
  }

  async fn lock_return(&mut self, return_id: i64) -> AppResult<Option<ReturnRequest>> {
    let row = sqlx::query_as(&format!("SELECT {} FROM returns WHERE id = $1 FOR UPDATE", RETURN_COLUMNS))
      .bind(return_id)
      .fetch_optional(self.conn()?)
      .await?;
    Ok(row)
  }

  async fn items_of_return(&mut self, return_id: i64) -> AppResult<Vec<ReturnItem>> {
    let rows = sqlx::query_as(&format!(
      "SELECT {} FROM return_items WHERE return_id = $1 ORDER BY id",
      RETURN_ITEM_COLUMNS
    ))
    .bind(return_id)
    .fetch_all(self.conn()?)
    .await?;
    Ok(rows)
  }

  async fn resolve_return(
    &mut self,
    return_id: i64,
    status: ReturnStatus,
    total_returned_quantity: i32,
  ) -> AppResult<ReturnRequest> {
    let conn = self.conn()?;
    sqlx::query("UPDATE return_items SET status = $2 WHERE return_id = $1")
      .bind(return_id)
      .bind(status)
      .execute(&mut *conn)
      .await?;
    let row = sqlx::query_as(&format!(
      "UPDATE returns SET status = $2, total_returned_quantity = $3 WHERE id = $1 RETURNING {}",
      RETURN_COLUMNS
    ))
    .bind(return_id)
    .bind(status)
    .bind(total_returned_quantity)
    .fetch_one(&mut *conn)
    .await?;
    Ok(row)
  }

  async fn commit(&mut self) -> AppResult<()> {
    self.take()?.commit().await?;
    Ok(())
  }

  async fn rollback(&mut self) -> AppResult<()> {
    self.take()?.rollback().await?;
    Ok(())
  }
}
