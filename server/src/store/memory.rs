// storefront/src/store/memory.rs

//! In-process `Store`.
//!
//! A transaction owns the store mutex from `begin` until `commit`/`rollback` and mutates a private
//! copy of the state; commit swaps the copy in. Transactions are therefore fully serialised.

use super::{NewOrder, NewOrderedItem, NewReturn, NewReturnItem, Store, StoreTx};
use crate::errors::{AppError, Result as AppResult};
use crate::models::{
  Cart, CartItem, CartLine, Discount, Order, OrderDetailItem, OrderDetails, OrderStatus, OrderSummary, OrderedItem,
  Product, ReturnItem, ReturnRequest, ReturnStatus,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct MemoryState {
  pub products: BTreeMap<i64, Product>,
  pub carts: BTreeMap<i64, Cart>,
  pub cart_items: BTreeMap<i64, CartItem>,
  pub discounts: BTreeMap<i64, Discount>,
  pub orders: BTreeMap<i64, Order>,
  pub ordered_items: BTreeMap<i64, OrderedItem>,
  pub returns: BTreeMap<i64, ReturnRequest>,
  pub return_items: BTreeMap<i64, ReturnItem>,
  last_id: i64,
}

impl MemoryState {
  fn next_id(&mut self) -> i64 {
    self.last_id += 1;
    self.last_id
  }

  fn cart_total(&self, cart_id: i64) -> Decimal {
    self
      .cart_items
      .values()
      .filter(|item| item.cart_id == cart_id)
      .filter_map(|item| {
        self
          .products
          .get(&item.product_id)
          .map(|p| p.price * Decimal::from(item.quantity))
      })
      .sum()
  }

  fn cart_lines(&self, cart_item_ids: &[i64]) -> Vec<CartLine> {
    let mut lines: Vec<CartLine> = cart_item_ids
      .iter()
      .filter_map(|id| self.cart_items.get(id))
      .filter_map(|item| {
        self.products.get(&item.product_id).map(|p| CartLine {
          cart_item_id: item.id,
          cart_id: item.cart_id,
          product_id: item.product_id,
          quantity: item.quantity,
          unit_price: p.price,
        })
      })
      .collect();
    lines.sort_by_key(|l| l.cart_item_id);
    lines.dedup_by_key(|l| l.cart_item_id);
    lines
  }

  fn items_of_return(&self, return_id: i64) -> Vec<ReturnItem> {
    self
      .return_items
      .values()
      .filter(|ri| ri.return_id == return_id)
      .cloned()
      .collect()
  }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
  state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Copy of the committed state.
  pub async fn snapshot(&self) -> MemoryState {
    self.state.lock().await.clone()
  }

  pub async fn product_stock(&self, product_id: i64) -> Option<i32> {
    self.state.lock().await.products.get(&product_id).map(|p| p.stock)
  }

  pub async fn add_product(&self, name: &str, price: Decimal, stock: i32) -> i64 {
    let mut state = self.state.lock().await;
    let id = state.next_id();
    state.products.insert(
      id,
      Product {
        id,
        name: name.to_string(),
        price,
        stock,
        category_id: None,
      },
    );
    id
  }

  pub async fn add_cart(&self, user_id: i64) -> i64 {
    let mut state = self.state.lock().await;
    let id = state.next_id();
    state.carts.insert(
      id,
      Cart {
        id,
        user_id,
        total_amount: Decimal::ZERO,
      },
    );
    id
  }

  /// Adds an item and refreshes the cart total.
  pub async fn add_cart_item(&self, cart_id: i64, product_id: i64, quantity: i32) -> i64 {
    let mut state = self.state.lock().await;
    let id = state.next_id();
    state.cart_items.insert(
      id,
      CartItem {
        id,
        cart_id,
        product_id,
        quantity,
      },
    );
    let total = state.cart_total(cart_id);
    if let Some(cart) = state.carts.get_mut(&cart_id) {
      cart.total_amount = total;
    }
    id
  }

  pub async fn add_discount(&self, code: &str, percentage: i32, expiration_date: DateTime<Utc>) -> i64 {
    let mut state = self.state.lock().await;
    let id = state.next_id();
    state.discounts.insert(
      id,
      Discount {
        id,
        code: code.to_string(),
        percentage,
        expiration_date,
      },
    );
    id
  }

  /// Demo catalogue: two products, a cart for user 1 and a `WELCOME10` discount.
  pub async fn seed_demo(&self) {
    let keyboard = self.add_product("Mechanical Keyboard", Decimal::new(4999, 2), 25).await;
    let mouse = self.add_product("Wireless Mouse", Decimal::new(1999, 2), 40).await;
    let cart = self.add_cart(1).await;
    self.add_cart_item(cart, keyboard, 1).await;
    self.add_cart_item(cart, mouse, 2).await;
    self
      .add_discount("WELCOME10", 10, Utc::now() + Duration::days(30))
      .await;
    info!(cart_id = cart, "Memory store seeded with demo data.");
  }
}

#[async_trait]
impl Store for MemoryStore {
  async fn begin(&self) -> AppResult<Box<dyn StoreTx>> {
    let guard = self.state.clone().lock_owned().await;
    let work = guard.clone();
    Ok(Box::new(MemoryTx {
      guard: Some(guard),
      work,
    }))
  }

  async fn orders_for_user(&self, user_id: i64) -> AppResult<Vec<OrderSummary>> {
    let state = self.state.lock().await;
    Ok(
      state
        .orders
        .values()
        .filter(|o| o.user_id == user_id)
        .map(|o| OrderSummary {
          order_id: o.id,
          net_amount: o.net_amount,
        })
        .collect(),
    )
  }

  async fn order_details(&self, user_id: i64, order_id: i64) -> AppResult<Option<OrderDetails>> {
    let state = self.state.lock().await;
    let Some(order) = state.orders.get(&order_id).filter(|o| o.user_id == user_id) else {
      return Ok(None);
    };
    let items = state
      .ordered_items
      .values()
      .filter(|oi| oi.order_id == order_id)
      .map(|oi| OrderDetailItem {
        ordered_item_id: oi.id,
        product_id: oi.product_id,
        product_name: state
          .products
          .get(&oi.product_id)
          .map(|p| p.name.clone())
          .unwrap_or_default(),
        quantity: oi.quantity,
        price: oi.price,
        current_quantity: oi.current_quantity,
      })
      .collect();
    Ok(Some(OrderDetails {
      order: order.clone(),
      items,
    }))
  }

  async fn all_orders(&self) -> AppResult<Vec<Order>> {
    Ok(self.state.lock().await.orders.values().cloned().collect())
  }

  async fn all_returns(&self) -> AppResult<Vec<ReturnRequest>> {
    let mut returns: Vec<ReturnRequest> = self.state.lock().await.returns.values().cloned().collect();
    returns.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    Ok(returns)
  }

  async fn return_items(&self, return_id: i64) -> AppResult<Vec<ReturnItem>> {
    Ok(self.state.lock().await.items_of_return(return_id))
  }

  async fn return_items_for_user(&self, return_id: i64, user_id: i64) -> AppResult<Vec<ReturnItem>> {
    let state = self.state.lock().await;
    let owned = state.returns.get(&return_id).is_some_and(|r| r.user_id == user_id);
    Ok(if owned { state.items_of_return(return_id) } else { Vec::new() })
  }

  async fn close(&self) {}
}

pub struct MemoryTx {
  guard: Option<OwnedMutexGuard<MemoryState>>,
  work: MemoryState,
}

impl MemoryTx {
  fn live(&mut self) -> AppResult<&mut MemoryState> {
    if self.guard.is_none() {
      return Err(AppError::Internal("Transaction already finished".to_string()));
    }
    Ok(&mut self.work)
  }
}

fn missing(what: &str, id: i64) -> AppError {
  AppError::NotFound(format!("{} {} not found", what, id))
}

#[async_trait]
impl StoreTx for MemoryTx {
  async fn lock_cart(&mut self, cart_id: i64) -> AppResult<Option<Cart>> {
    Ok(self.live()?.carts.get(&cart_id).cloned())
  }

  async fn lock_cart_items(&mut self, cart_item_ids: &[i64]) -> AppResult<Vec<CartItem>> {
    let state = self.live()?;
    let mut items: Vec<CartItem> = cart_item_ids
      .iter()
      .filter_map(|id| state.cart_items.get(id).cloned())
      .collect();
    items.sort_by_key(|i| i.id);
    items.dedup_by_key(|i| i.id);
    Ok(items)
  }

  async fn lock_items_of_cart(&mut self, cart_id: i64) -> AppResult<Vec<CartItem>> {
    let state = self.live()?;
    Ok(state.cart_items.values().filter(|i| i.cart_id == cart_id).cloned().collect())
  }

  async fn price_cart_items(&mut self, cart_item_ids: &[i64]) -> AppResult<Vec<CartLine>> {
    Ok(self.live()?.cart_lines(cart_item_ids))
  }

  async fn delete_cart_items(&mut self, cart_item_ids: &[i64]) -> AppResult<()> {
    let state = self.live()?;
    for id in cart_item_ids {
      state.cart_items.remove(id);
    }
    Ok(())
  }

  async fn recompute_cart_total(&mut self, cart_id: i64) -> AppResult<Decimal> {
    let state = self.live()?;
    let total = state.cart_total(cart_id);
    let cart = state.carts.get_mut(&cart_id).ok_or_else(|| missing("Cart", cart_id))?;
    cart.total_amount = total;
    Ok(total)
  }

  async fn lock_product_stock(&mut self, product_id: i64) -> AppResult<Option<i32>> {
    Ok(self.live()?.products.get(&product_id).map(|p| p.stock))
  }

  async fn adjust_product_stock(&mut self, product_id: i64, delta: i32) -> AppResult<i32> {
    let product = self
      .live()?
      .products
      .get_mut(&product_id)
      .ok_or_else(|| missing("Product", product_id))?;
    let stock = product.stock + delta;
    if stock < 0 {
      return Err(AppError::Internal(format!(
        "stock of product {} would become negative",
        product_id
      )));
    }
    product.stock = stock;
    Ok(stock)
  }

  async fn find_discount_by_id(&mut self, discount_id: i64) -> AppResult<Option<Discount>> {
    Ok(self.live()?.discounts.get(&discount_id).cloned())
  }

  async fn find_discount_by_code(&mut self, code: &str) -> AppResult<Option<Discount>> {
    Ok(self.live()?.discounts.values().find(|d| d.code == code).cloned())
  }

  async fn insert_order(&mut self, order: NewOrder) -> AppResult<Order> {
    let state = self.live()?;
    let id = state.next_id();
    let row = Order {
      id,
      user_id: order.user_id,
      address_id: order.address_id,
      discount_id: order.discount_id,
      total_amount: order.total_amount,
      discount_amount: order.discount_amount,
      net_amount: order.net_amount,
      status: OrderStatus::Pending,
      payment_status: order.payment_status,
      payment_method: order.payment_method,
      transaction_id: order.transaction_id,
      created_at: order.created_at,
    };
    state.orders.insert(id, row.clone());
    Ok(row)
  }

  async fn lock_order(&mut self, order_id: i64) -> AppResult<Option<Order>> {
    Ok(self.live()?.orders.get(&order_id).cloned())
  }

  async fn set_order_status(&mut self, order_id: i64, status: OrderStatus) -> AppResult<Order> {
    let order = self
      .live()?
      .orders
      .get_mut(&order_id)
      .ok_or_else(|| missing("Order", order_id))?;
    order.status = status;
    Ok(order.clone())
  }

  async fn insert_ordered_item(&mut self, item: NewOrderedItem) -> AppResult<OrderedItem> {
    let state = self.live()?;
    let id = state.next_id();
    let row = OrderedItem {
      id,
      order_id: item.order_id,
      product_id: item.product_id,
      quantity: item.quantity,
      price: item.price,
      current_quantity: item.quantity,
    };
    state.ordered_items.insert(id, row.clone());
    Ok(row)
  }

  async fn lock_ordered_items(&mut self, order_id: i64) -> AppResult<Vec<OrderedItem>> {
    let state = self.live()?;
    Ok(
      state
        .ordered_items
        .values()
        .filter(|oi| oi.order_id == order_id)
        .cloned()
        .collect(),
    )
  }

  async fn consume_returnable(&mut self, ordered_item_id: i64, quantity: i32) -> AppResult<i32> {
    let item = self
      .live()?
      .ordered_items
      .get_mut(&ordered_item_id)
      .ok_or_else(|| missing("Ordered item", ordered_item_id))?;
    let remaining = item.current_quantity - quantity;
    if remaining < 0 {
      return Err(AppError::Internal(format!(
        "current_quantity of ordered item {} would become negative",
        ordered_item_id
      )));
    }
    item.current_quantity = remaining;
    Ok(remaining)
  }

  async fn insert_return(&mut self, request: NewReturn) -> AppResult<ReturnRequest> {
    let state = self.live()?;
    let id = state.next_id();
    let row = ReturnRequest {
      id,
      user_id: request.user_id,
      order_id: request.order_id,
      return_reason: request.return_reason,
      status: ReturnStatus::Pending,
      total_returned_quantity: 0,
      created_at: request.created_at,
    };
    state.returns.insert(id, row.clone());
    Ok(row)
  }

  async fn insert_return_item(&mut self, item: NewReturnItem) -> AppResult<ReturnItem> {
    let state = self.live()?;
    let id = state.next_id();
    let row = ReturnItem {
      id,
      return_id: item.return_id,
      product_id: item.product_id,
      quantity: item.quantity,
      ordered_item_id: item.ordered_item_id,
      reason: item.reason,
      status: ReturnStatus::Pending,
      created_at: item.created_at,
    };
    state.return_items.insert(id, row.clone());
    Ok(row)
  }

  async fn lock_return(&mut self, return_id: i64) -> AppResult<Option<ReturnRequest>> {
    Ok(self.live()?.returns.get(&return_id).cloned())
  }

  async fn items_of_return(&mut self, return_id: i64) -> AppResult<Vec<ReturnItem>> {
    Ok(self.live()?.items_of_return(return_id))
  }

  async fn resolve_return(
    &mut self,
    return_id: i64,
    status: ReturnStatus,
    total_returned_quantity: i32,
  ) -> AppResult<ReturnRequest> {
    let state = self.live()?;
    for item in state.return_items.values_mut().filter(|ri| ri.return_id == return_id) {
      item.status = status;
    }
    let request = state.returns.get_mut(&return_id).ok_or_else(|| missing("Return", return_id))?;
    request.status = status;
    request.total_returned_quantity = total_returned_quantity;
    Ok(request.clone())
  }

  async fn commit(&mut self) -> AppResult<()> {
    let mut guard = self
      .guard
      .take()
      .ok_or_else(|| AppError::Internal("Transaction already finished".to_string()))?;
    *guard = std::mem::take(&mut self.work);
    Ok(())
  }

  async fn rollback(&mut self) -> AppResult<()> {
    self
      .guard
      .take()
      .ok_or_else(|| AppError::Internal("Transaction already finished".to_string()))?;
    self.work = MemoryState::default();
    Ok(())
  }
}
