// storefront/src/pipelines/order_pipeline.rs

//! Order creation: cart snapshot, discount, order row, stock reservation, cart clearing.
//! Runs atomically, so a failure in any step leaves no order, no stock change and an untouched cart.

use crate::errors::{AppError, Result as AppResult};
use crate::pipelines::contexts::{filled, CreateOrderCtxData};
use crate::services::{cart_snapshot, discount_resolver, stock_ledger};
use crate::store::{NewOrder, NewOrderedItem};
use storeflow::{ContextData, Pipeline, PipelineControl, Registry};
use tracing::{info, instrument};

pub fn register_order_pipeline(registry: &Registry<AppError>) {
  let mut p = Pipeline::<CreateOrderCtxData, AppError>::new(&[
    ("validate_cart", false, None),
    ("resolve_discount", false, None),
    ("insert_order", false, None),
    ("reserve_items", false, None),
    ("clear_cart", false, None),
  ]);

  p.on_step("validate_cart", validate_cart_step);
  p.on_step("resolve_discount", resolve_discount_step);
  p.on_step("insert_order", insert_order_step);
  p.on_step("reserve_items", reserve_items_step);
  p.on_step("clear_cart", clear_cart_step);

  registry.register_pipeline(p);
}

#[instrument(name = "create_order::validate_cart", skip(ctx_data), err(Display))]
async fn validate_cart_step(ctx_data: ContextData<CreateOrderCtxData>) -> AppResult<PipelineControl> {
  let (tx, user_id, selection) = ctx_data.read_with(|c| (c.tx.clone(), c.input.user_id, c.input.selection.clone()));

  let snapshot = {
    let mut guard = tx.acquire().await;
    cart_snapshot::read(guard.as_mut(), user_id, &selection).await?
  };
  info!(
    user_id,
    cart_id = snapshot.cart_id,
    lines = snapshot.lines.len(),
    subtotal = %snapshot.subtotal(),
    "Cart validated."
  );

  ctx_data.write().snapshot = Some(snapshot);
  Ok(PipelineControl::Continue)
}

#[instrument(name = "create_order::resolve_discount", skip(ctx_data), err(Display))]
async fn resolve_discount_step(ctx_data: ContextData<CreateOrderCtxData>) -> AppResult<PipelineControl> {
  let (tx, discount_ref, snapshot, now) = {
    let guard = ctx_data.read();
    (
      guard.tx.clone(),
      guard.input.discount.clone(),
      filled(&guard.snapshot, "cart snapshot")?,
      guard.now,
    )
  };

  let resolved = {
    let mut guard = tx.acquire().await;
    discount_resolver::resolve(guard.as_mut(), discount_ref.as_ref(), snapshot.subtotal(), now).await?
  };

  ctx_data.write().discount = Some(resolved);
  Ok(PipelineControl::Continue)
}

#[instrument(name = "create_order::insert_order", skip(ctx_data), err(Display))]
async fn insert_order_step(ctx_data: ContextData<CreateOrderCtxData>) -> AppResult<PipelineControl> {
  let (tx, new_order) = {
    let guard = ctx_data.read();
    let snapshot = filled(&guard.snapshot, "cart snapshot")?;
    let discount = filled(&guard.discount, "discount")?;
    let total_amount = snapshot.subtotal();
    let new_order = NewOrder {
      user_id: guard.input.user_id,
      address_id: guard.input.address_id,
      discount_id: discount.discount_id,
      total_amount,
      discount_amount: discount.amount,
      net_amount: total_amount - discount.amount,
      payment_status: guard.input.payment_status,
      payment_method: guard.input.payment_method,
      transaction_id: guard.input.transaction_id.clone(),
      created_at: guard.now,
    };
    (guard.tx.clone(), new_order)
  };

  let order = tx.acquire().await.insert_order(new_order).await?;
  info!(
    order_id = order.id,
    total_amount = %order.total_amount,
    discount_amount = %order.discount_amount,
    net_amount = %order.net_amount,
    "Order row inserted."
  );

  ctx_data.write().order = Some(order);
  Ok(PipelineControl::Continue)
}

/// Reserves stock product by product in ascending id, then records every line at its captured price.
#[instrument(name = "create_order::reserve_items", skip(ctx_data), err(Display))]
async fn reserve_items_step(ctx_data: ContextData<CreateOrderCtxData>) -> AppResult<PipelineControl> {
  let (tx, snapshot, order) = {
    let guard = ctx_data.read();
    (
      guard.tx.clone(),
      filled(&guard.snapshot, "cart snapshot")?,
      filled(&guard.order, "order")?,
    )
  };

  let mut ordered_items = Vec::with_capacity(snapshot.lines.len());
  {
    let mut guard = tx.acquire().await;
    stock_ledger::reserve_many(guard.as_mut(), &snapshot.quantities_by_product()?).await?;
    for line in &snapshot.lines {
      let item = guard
        .insert_ordered_item(NewOrderedItem {
          order_id: order.id,
          product_id: line.product_id,
          quantity: line.quantity,
          price: line.unit_price,
        })
        .await?;
      ordered_items.push(item);
    }
  }
  info!(order_id = order.id, items = ordered_items.len(), "Stock reserved and items recorded.");

  ctx_data.write().ordered_items = ordered_items;
  Ok(PipelineControl::Continue)
}

#[instrument(name = "create_order::clear_cart", skip(ctx_data), err(Display))]
async fn clear_cart_step(ctx_data: ContextData<CreateOrderCtxData>) -> AppResult<PipelineControl> {
  let (tx, snapshot) = {
    let guard = ctx_data.read();
    (guard.tx.clone(), filled(&guard.snapshot, "cart snapshot")?)
  };

  let remaining_total = {
    let mut guard = tx.acquire().await;
    guard.delete_cart_items(&snapshot.cart_item_ids()).await?;
    guard.recompute_cart_total(snapshot.cart_id).await?
  };
  info!(cart_id = snapshot.cart_id, remaining_total = %remaining_total, "Checked-out items removed from cart.");
  Ok(PipelineControl::Continue)
}
