// tests/order_workflow_tests.rs

mod common;

use chrono::{Duration, Utc};
use common::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use storefront::errors::AppError;
use storefront::models::OrderStatus;
use storefront::pipelines::contexts::Actor;
use storefront::services::cart_snapshot::CartSelection;
use storefront::services::discount_resolver::DiscountRef;

#[tokio::test]
async fn whole_cart_checkout_without_discount() {
  let shop = shop();
  let (product, cart, _) = cart_with(&shop.store, 1, dec!(10.00), 10, 2).await;

  let (order, items) = create_order(&shop.state, order_input(1, CartSelection::Cart(cart), None))
    .await
    .unwrap();

  assert_eq!(order.total_amount, dec!(20.00));
  assert_eq!(order.discount_amount, Decimal::ZERO);
  assert_eq!(order.net_amount, dec!(20.00));
  assert_eq!(order.status, OrderStatus::Pending);
  assert_eq!(order.discount_id, None);

  assert_eq!(items.len(), 1);
  assert_eq!(items[0].price, dec!(10.00));
  assert_eq!(items[0].quantity, 2);
  assert_eq!(items[0].current_quantity, 2);

  let state = shop.store.snapshot().await;
  assert_eq!(state.products[&product].stock, 8);
  assert!(state.cart_items.values().all(|i| i.cart_id != cart));
  assert_eq!(state.carts[&cart].total_amount, Decimal::ZERO);
}

#[tokio::test]
async fn checkout_applies_percentage_discount() {
  let shop = shop();
  let (_, cart, _) = cart_with(&shop.store, 1, dec!(25.00), 10, 2).await;
  let discount = shop.store.add_discount("TENOFF", 10, Utc::now() + Duration::days(1)).await;

  let (order, _) = create_order(
    &shop.state,
    order_input(1, CartSelection::Cart(cart), Some(DiscountRef::Id(discount))),
  )
  .await
  .unwrap();

  assert_eq!(order.total_amount, dec!(50.00));
  assert_eq!(order.discount_amount, dec!(5.00));
  assert_eq!(order.net_amount, dec!(45.00));
  assert_eq!(order.discount_id, Some(discount));
}

#[tokio::test]
async fn discount_code_resolves_like_an_id() {
  let shop = shop();
  let (_, cart, _) = cart_with(&shop.store, 1, dec!(19.99), 10, 1).await;
  shop.store.add_discount("SPRING15", 15, Utc::now() + Duration::days(1)).await;

  let (order, _) = create_order(
    &shop.state,
    order_input(1, CartSelection::Cart(cart), Some(DiscountRef::Code("SPRING15".to_string()))),
  )
  .await
  .unwrap();

  assert_eq!(order.discount_amount, dec!(3.00));
  assert_eq!(order.net_amount, dec!(16.99));
}

#[tokio::test]
async fn insufficient_stock_creates_nothing() {
  let shop = shop();
  let (product, cart, item) = cart_with(&shop.store, 1, dec!(10.00), 3, 5).await;

  let err = create_order(&shop.state, order_input(1, CartSelection::Items(vec![item]), None))
    .await
    .unwrap_err();

  assert!(matches!(
    err,
    AppError::InsufficientStock {
      product_id,
      requested: 5,
      available: 3,
    } if product_id == product
  ));
  let state = shop.store.snapshot().await;
  assert!(state.orders.is_empty());
  assert!(state.ordered_items.is_empty());
  assert_eq!(state.products[&product].stock, 3);
  assert!(state.cart_items.contains_key(&item));
  assert_eq!(state.carts[&cart].total_amount, dec!(50.00));
}

#[tokio::test]
async fn failure_on_a_later_product_rolls_back_earlier_reservations() {
  let shop = shop();
  let (plenty, cart, _) = cart_with(&shop.store, 1, dec!(5.00), 10, 2).await;
  let scarce = shop.store.add_product("Scarce", dec!(7.50), 1).await;
  shop.store.add_cart_item(cart, scarce, 2).await;

  let err = create_order(&shop.state, order_input(1, CartSelection::Cart(cart), None))
    .await
    .unwrap_err();
  assert!(matches!(err, AppError::InsufficientStock { .. }));

  let state = shop.store.snapshot().await;
  assert_eq!(state.products[&plenty].stock, 10);
  assert_eq!(state.products[&scarce].stock, 1);
  assert!(state.orders.is_empty());
  assert_eq!(state.cart_items.values().filter(|i| i.cart_id == cart).count(), 2);
}

#[tokio::test]
async fn expired_discount_is_rejected_and_rolled_back() {
  let shop = shop();
  let (product, cart, _) = cart_with(&shop.store, 1, dec!(10.00), 10, 1).await;
  let now = Utc::now();
  let discount = shop.store.add_discount("OLD", 20, now - Duration::minutes(1)).await;

  let err = create_order_at(
    &shop.state,
    order_input(1, CartSelection::Cart(cart), Some(DiscountRef::Id(discount))),
    now,
  )
  .await
  .unwrap_err();
  assert!(matches!(err, AppError::InvalidOrExpiredDiscount));

  let state = shop.store.snapshot().await;
  assert!(state.orders.is_empty());
  assert_eq!(state.products[&product].stock, 10);
}

#[tokio::test]
async fn partial_checkout_recomputes_remaining_cart_total() {
  let shop = shop();
  let (_, cart, bought) = cart_with(&shop.store, 1, dec!(10.00), 10, 1).await;
  let other = shop.store.add_product("Mug", dec!(4.25), 10).await;
  let kept = shop.store.add_cart_item(cart, other, 2).await;

  let (order, items) = create_order(&shop.state, order_input(1, CartSelection::Items(vec![bought]), None))
    .await
    .unwrap();
  assert_eq!(order.total_amount, dec!(10.00));
  let line_sum: Decimal = items.iter().map(|i| i.price * Decimal::from(i.quantity)).sum();
  assert_eq!(order.total_amount, line_sum);
  assert_eq!(order.net_amount, order.total_amount - order.discount_amount);

  let state = shop.store.snapshot().await;
  assert!(!state.cart_items.contains_key(&bought));
  assert!(state.cart_items.contains_key(&kept));
  assert_eq!(state.carts[&cart].total_amount, dec!(8.50));
}

#[tokio::test]
async fn foreign_or_empty_carts_are_rejected() {
  let shop = shop();
  let (_, cart, item) = cart_with(&shop.store, 1, dec!(10.00), 10, 1).await;
  let empty = shop.store.add_cart(2).await;

  let foreign = create_order(&shop.state, order_input(2, CartSelection::Items(vec![item]), None)).await;
  assert!(matches!(foreign, Err(AppError::CartNotFound)));

  let foreign_cart = create_order(&shop.state, order_input(2, CartSelection::Cart(cart), None)).await;
  assert!(matches!(foreign_cart, Err(AppError::CartNotFound)));

  let nothing = create_order(&shop.state, order_input(2, CartSelection::Cart(empty), None)).await;
  assert!(matches!(nothing, Err(AppError::EmptyCart)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_checkouts_of_the_last_unit_admit_one() {
  let shop = shop();
  let product = shop.store.add_product("Last one", dec!(99.00), 1).await;
  let first_cart = shop.store.add_cart(1).await;
  shop.store.add_cart_item(first_cart, product, 1).await;
  let second_cart = shop.store.add_cart(2).await;
  shop.store.add_cart_item(second_cart, product, 1).await;

  let (a, b) = tokio::join!(
    tokio::spawn({
      let state = shop.state.clone();
      async move { create_order(&state, order_input(1, CartSelection::Cart(first_cart), None)).await }
    }),
    tokio::spawn({
      let state = shop.state.clone();
      async move { create_order(&state, order_input(2, CartSelection::Cart(second_cart), None)).await }
    }),
  );
  let outcomes = [a.unwrap(), b.unwrap()];

  assert_eq!(outcomes.iter().filter(|o| o.is_ok()).count(), 1);
  assert_eq!(
    outcomes
      .iter()
      .filter(|o| matches!(o, Err(AppError::InsufficientStock { .. })))
      .count(),
    1
  );
  let state = shop.store.snapshot().await;
  assert_eq!(state.products[&product].stock, 0);
  assert_eq!(state.orders.len(), 1);
}

#[tokio::test]
async fn cancelling_restores_stock_once() {
  let shop = shop();
  let (product, cart, _) = cart_with(&shop.store, 1, dec!(10.00), 10, 3).await;
  let (order, _) = create_order(&shop.state, order_input(1, CartSelection::Cart(cart), None))
    .await
    .unwrap();
  assert_eq!(shop.store.product_stock(product).await, Some(7));

  let cancelled = change_status(&shop.state, Actor::User(1), order.id, OrderStatus::Cancelled)
    .await
    .unwrap();
  assert_eq!(cancelled.status, OrderStatus::Cancelled);
  assert_eq!(shop.store.product_stock(product).await, Some(10));

  let again = change_status(&shop.state, Actor::User(1), order.id, OrderStatus::Cancelled).await;
  assert!(matches!(again, Err(AppError::AlreadyCancelled)));
  assert_eq!(shop.store.product_stock(product).await, Some(10));
}

#[tokio::test]
async fn users_cannot_cancel_foreign_orders() {
  let shop = shop();
  let (product, cart, _) = cart_with(&shop.store, 1, dec!(10.00), 10, 2).await;
  let (order, _) = create_order(&shop.state, order_input(1, CartSelection::Cart(cart), None))
    .await
    .unwrap();

  let err = change_status(&shop.state, Actor::User(2), order.id, OrderStatus::Cancelled).await;
  assert!(matches!(err, Err(AppError::OrderNotFound)));
  let missing = change_status(&shop.state, Actor::User(1), order.id + 100, OrderStatus::Cancelled).await;
  assert!(matches!(missing, Err(AppError::OrderNotFound)));

  assert_eq!(shop.store.product_stock(product).await, Some(8));
  assert_eq!(shop.store.snapshot().await.orders[&order.id].status, OrderStatus::Pending);
}

#[tokio::test]
async fn admin_transitions_follow_the_status_table() {
  let shop = shop();
  let (product, cart, _) = cart_with(&shop.store, 1, dec!(10.00), 10, 2).await;
  let (order, _) = create_order(&shop.state, order_input(1, CartSelection::Cart(cart), None))
    .await
    .unwrap();

  let missing = change_status(&shop.state, Actor::Admin, 9_999, OrderStatus::Delivered).await;
  assert!(matches!(missing, Err(AppError::NotFound(_))));

  let delivered = change_status(&shop.state, Actor::Admin, order.id, OrderStatus::Delivered)
    .await
    .unwrap();
  assert_eq!(delivered.status, OrderStatus::Delivered);

  let cancel = change_status(&shop.state, Actor::User(1), order.id, OrderStatus::Cancelled).await;
  assert!(matches!(
    cancel,
    Err(AppError::InvalidStatusTransition {
      from: OrderStatus::Delivered,
      to: OrderStatus::Cancelled
    })
  ));
  let back = change_status(&shop.state, Actor::Admin, order.id, OrderStatus::Pending).await;
  assert!(matches!(back, Err(AppError::InvalidStatusTransition { .. })));
  assert_eq!(shop.store.product_stock(product).await, Some(8));
}

#[tokio::test]
async fn admin_cancellation_restores_stock() {
  let shop = shop();
  let (product, cart, _) = cart_with(&shop.store, 1, dec!(10.00), 4, 4).await;
  let (order, _) = create_order(&shop.state, order_input(1, CartSelection::Cart(cart), None))
    .await
    .unwrap();
  assert_eq!(shop.store.product_stock(product).await, Some(0));

  change_status(&shop.state, Actor::Admin, order.id, OrderStatus::Cancelled)
    .await
    .unwrap();
  assert_eq!(shop.store.product_stock(product).await, Some(4));
}
