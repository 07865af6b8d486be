// tests/common/mod.rs
#![allow(dead_code)]

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use std::sync::Arc;
use storefront::config::AppConfig;
use storefront::errors::AppError;
use storefront::models::{Order, OrderStatus, OrderedItem, PaymentMethod, PaymentStatus, ReturnRequest, ReturnStatus};
use storefront::pipelines::contexts::{
  Actor, CreateOrderCtxData, CreateOrderInput, CreateReturnCtxData, OrderStatusCtxData, ResolveReturnCtxData,
  ReturnItemInput,
};
use storefront::pipelines::TxScope;
use storefront::services::cart_snapshot::CartSelection;
use storefront::services::discount_resolver::DiscountRef;
use storefront::state::AppState;
use storefront::store::MemoryStore;
use storeflow::{AtomicContext, ContextData, PipelineResult};
use tracing::Level;

static TRACING: Lazy<()> = Lazy::new(|| {
  let _ = tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING);
}

/// A memory-backed service plus direct access to its store for seeding and inspection.
pub struct Shop {
  pub store: MemoryStore,
  pub state: AppState,
}

pub fn shop() -> Shop {
  setup_tracing();
  let store = MemoryStore::new();
  let config = AppConfig::from_source(|key| (key == "STORE_BACKEND").then(|| "memory".to_string()))
    .expect("memory config is valid");
  let state = storefront::build_state(Arc::new(store.clone()), Arc::new(config));
  Shop { store, state }
}

pub fn order_input(user_id: i64, selection: CartSelection, discount: Option<DiscountRef>) -> CreateOrderInput {
  CreateOrderInput {
    user_id,
    selection,
    discount,
    address_id: 1,
    payment_status: PaymentStatus::Pending,
    payment_method: PaymentMethod::Card,
    transaction_id: None,
  }
}

pub fn return_item(ordered: &OrderedItem, quantity: i32) -> ReturnItemInput {
  ReturnItemInput {
    product_id: ordered.product_id,
    quantity,
    reason: "damaged".to_string(),
    ordered_item_id: ordered.id,
  }
}

async fn run<TData: AtomicContext>(state: &AppState, ctx_data: ContextData<TData>) -> Result<(), AppError> {
  match state.workflows.run_atomic(ctx_data).await? {
    PipelineResult::Completed => Ok(()),
    PipelineResult::Stopped => Err(AppError::Internal("stopped".to_string())),
  }
}

pub async fn create_order(state: &AppState, input: CreateOrderInput) -> Result<(Order, Vec<OrderedItem>), AppError> {
  let tx = TxScope::begin(state.store.as_ref()).await?;
  let ctx_data = ContextData::new(CreateOrderCtxData::new(tx, input));
  run(state, ctx_data.clone()).await?;
  let guard = ctx_data.read();
  Ok((guard.order.clone().expect("order set"), guard.ordered_items.clone()))
}

/// Creates an order for the whole cart at `now`, used to pin discount expiry checks.
pub async fn create_order_at(
  state: &AppState,
  input: CreateOrderInput,
  now: DateTime<Utc>,
) -> Result<Order, AppError> {
  let tx = TxScope::begin(state.store.as_ref()).await?;
  let mut data = CreateOrderCtxData::new(tx, input);
  data.now = now;
  let ctx_data = ContextData::new(data);
  run(state, ctx_data.clone()).await?;
  let order = ctx_data.read().order.clone().expect("order set");
  Ok(order)
}

pub async fn change_status(state: &AppState, actor: Actor, order_id: i64, target: OrderStatus) -> Result<Order, AppError> {
  let tx = TxScope::begin(state.store.as_ref()).await?;
  let ctx_data = ContextData::new(OrderStatusCtxData::new(tx, actor, order_id, target));
  run(state, ctx_data.clone()).await?;
  let order = ctx_data.read().order.clone().expect("order set");
  Ok(order)
}

pub async fn create_return(
  state: &AppState,
  user_id: i64,
  order_id: i64,
  items: Vec<ReturnItemInput>,
) -> Result<ReturnRequest, AppError> {
  let tx = TxScope::begin(state.store.as_ref()).await?;
  let ctx_data = ContextData::new(CreateReturnCtxData::new(tx, user_id, order_id, "not as described".to_string(), items));
  run(state, ctx_data.clone()).await?;
  let created = ctx_data.read().created.clone().expect("return set");
  Ok(created)
}

pub async fn resolve_return(state: &AppState, return_id: i64, decision: ReturnStatus) -> Result<ReturnRequest, AppError> {
  let tx = TxScope::begin(state.store.as_ref()).await?;
  let ctx_data = ContextData::new(ResolveReturnCtxData::new(tx, return_id, decision));
  run(state, ctx_data.clone()).await?;
  let resolved = ctx_data.read().resolved.clone().expect("resolution set");
  Ok(resolved)
}

/// Seeds a product and a cart for `user_id` holding `quantity` of it. Returns (product, cart, cart item).
pub async fn cart_with(store: &MemoryStore, user_id: i64, price: Decimal, stock: i32, quantity: i32) -> (i64, i64, i64) {
  let product = store.add_product("Widget", price, stock).await;
  let cart = store.add_cart(user_id).await;
  let item = store.add_cart_item(cart, product, quantity).await;
  (product, cart, item)
}

/// Places and delivers an order of `quantity` units. Returns the order and its single ordered item.
pub async fn delivered_order(shop: &Shop, user_id: i64, stock: i32, quantity: i32) -> (Order, OrderedItem) {
  let (_, cart, _) = cart_with(&shop.store, user_id, Decimal::new(1000, 2), stock, quantity).await;
  let (order, items) = create_order(&shop.state, order_input(user_id, CartSelection::Cart(cart), None))
    .await
    .expect("order created");
  change_status(&shop.state, Actor::Admin, order.id, OrderStatus::Delivered)
    .await
    .expect("order delivered");
  (order, items.into_iter().next().expect("one ordered item"))
}
