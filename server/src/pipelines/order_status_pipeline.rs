// storefront/src/pipelines/order_status_pipeline.rs

//! Order status changes: user cancellation and admin updates share one workflow.
//! A transition to `Cancelled` gives every ordered unit back to stock.

use crate::errors::{AppError, Result as AppResult};
use crate::models::OrderStatus;
use crate::pipelines::contexts::{filled, Actor, OrderStatusCtxData};
use crate::services::stock_ledger;
use std::sync::Arc;
use storeflow::{ContextData, Pipeline, PipelineControl, Registry, SkipCondition};
use tracing::{info, instrument, warn};

pub fn register_order_status_pipeline(registry: &Registry<AppError>) {
  let unless_cancelling: SkipCondition<OrderStatusCtxData> =
    Arc::new(|ctx_data: ContextData<OrderStatusCtxData>| ctx_data.read().target != OrderStatus::Cancelled);

  let mut p = Pipeline::<OrderStatusCtxData, AppError>::new(&[
    ("load_order", false, None),
    ("check_transition", false, None),
    ("restore_stock", false, Some(unless_cancelling)),
    ("apply_status", false, None),
  ]);

  p.on_step("load_order", load_order_step);
  p.on_step("check_transition", check_transition_step);
  p.on_step("restore_stock", restore_stock_step);
  p.on_step("apply_status", apply_status_step);

  registry.register_pipeline(p);
}

#[instrument(name = "order_status::load_order", skip(ctx_data), err(Display))]
async fn load_order_step(ctx_data: ContextData<OrderStatusCtxData>) -> AppResult<PipelineControl> {
  let (tx, actor, order_id) = ctx_data.read_with(|c| (c.tx.clone(), c.actor, c.order_id));

  let order = tx.acquire().await.lock_order(order_id).await?;
  let order = match (order, actor) {
    (Some(order), Actor::Admin) => order,
    (Some(order), Actor::User(user_id)) if order.user_id == user_id => order,
    (Some(_), Actor::User(user_id)) => {
      warn!(order_id, user_id, "Order belongs to another user.");
      return Err(AppError::OrderNotFound);
    }
    (None, Actor::User(_)) => return Err(AppError::OrderNotFound),
    (None, Actor::Admin) => return Err(AppError::NotFound(format!("Order {} not found", order_id))),
  };

  ctx_data.write().order = Some(order);
  Ok(PipelineControl::Continue)
}

#[instrument(name = "order_status::check_transition", skip(ctx_data), err(Display))]
async fn check_transition_step(ctx_data: ContextData<OrderStatusCtxData>) -> AppResult<PipelineControl> {
  let (order, target) = {
    let guard = ctx_data.read();
    (filled(&guard.order, "order")?, guard.target)
  };

  if order.status == OrderStatus::Cancelled && target == OrderStatus::Cancelled {
    return Err(AppError::AlreadyCancelled);
  }
  if !order.status.can_transition_to(target) {
    return Err(AppError::InvalidStatusTransition {
      from: order.status,
      to: target,
    });
  }
  Ok(PipelineControl::Continue)
}

#[instrument(name = "order_status::restore_stock", skip(ctx_data), err(Display))]
async fn restore_stock_step(ctx_data: ContextData<OrderStatusCtxData>) -> AppResult<PipelineControl> {
  let (tx, order_id) = ctx_data.read_with(|c| (c.tx.clone(), c.order_id));

  let restored = {
    let mut guard = tx.acquire().await;
    let items = guard.lock_ordered_items(order_id).await?;
    let quantities = stock_ledger::aggregate(items.iter().map(|i| (i.product_id, i.quantity)))?;
    stock_ledger::restore_many(guard.as_mut(), &quantities).await?;
    quantities
  };
  info!(order_id, products = restored.len(), "Stock restored for cancelled order.");

  ctx_data.write().restored = restored;
  Ok(PipelineControl::Continue)
}

#[instrument(name = "order_status::apply_status", skip(ctx_data), err(Display))]
async fn apply_status_step(ctx_data: ContextData<OrderStatusCtxData>) -> AppResult<PipelineControl> {
  let (tx, order_id, target) = ctx_data.read_with(|c| (c.tx.clone(), c.order_id, c.target));

  let order = tx.acquire().await.set_order_status(order_id, target).await?;
  info!(order_id, status = %order.status, "Order status updated.");

  ctx_data.write().order = Some(order);
  Ok(PipelineControl::Continue)
}
