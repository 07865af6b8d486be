// storefront/src/pipelines/return_pipeline.rs

//! Return requests.
//!
//! Creation only records the request. Approval is where stock comes back and the ordered items'
//! returnable quantity goes down; rejection changes statuses only. Both decisions are final.

use crate::errors::{AppError, Result as AppResult};
use crate::models::{OrderStatus, OrderedItem, ReturnItem, ReturnStatus};
use crate::pipelines::contexts::{filled, CreateReturnCtxData, ResolveReturnCtxData, ReturnItemInput};
use crate::services::stock_ledger;
use crate::store::{NewReturn, NewReturnItem, StoreTx};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use storeflow::{ContextData, Pipeline, PipelineControl, Registry, SkipCondition};
use tracing::{info, instrument, warn};

pub fn register_create_return_pipeline(registry: &Registry<AppError>) {
  let mut p = Pipeline::<CreateReturnCtxData, AppError>::new(&[
    ("validate_items", false, None),
    ("load_order", false, None),
    ("check_returnable", false, None),
    ("insert_return", false, None),
  ]);

  p.on_step("validate_items", validate_items_step);
  p.on_step("load_order", load_order_step);
  p.on_step("check_returnable", check_returnable_step);
  p.on_step("insert_return", insert_return_step);

  registry.register_pipeline(p);
}

pub fn register_resolve_return_pipeline(registry: &Registry<AppError>) {
  let unless_approving: SkipCondition<ResolveReturnCtxData> =
    Arc::new(|ctx_data: ContextData<ResolveReturnCtxData>| ctx_data.read().decision != ReturnStatus::Approved);

  let mut p = Pipeline::<ResolveReturnCtxData, AppError>::new(&[
    ("load_return", false, None),
    ("restock_items", false, Some(unless_approving)),
    ("apply_decision", false, None),
  ]);

  p.on_step("load_return", load_return_step);
  p.on_step("restock_items", restock_items_step);
  p.on_step("apply_decision", apply_decision_step);

  registry.register_pipeline(p);
}

/// Checks the requested quantities per ordered item against what is still returnable.
fn check_against_ordered(items: &[(i64, i64, i32)], ordered: &[OrderedItem]) -> AppResult<BTreeMap<i64, i32>> {
  let by_id: HashMap<i64, &OrderedItem> = ordered.iter().map(|oi| (oi.id, oi)).collect();
  let mut requested: BTreeMap<i64, i32> = BTreeMap::new();

  for &(ordered_item_id, product_id, quantity) in items {
    let ordered_item = by_id.get(&ordered_item_id).ok_or_else(|| {
      AppError::InvalidReturnItem(format!(
        "ordered item {} is not part of this order",
        ordered_item_id
      ))
    })?;
    if ordered_item.product_id != product_id {
      return Err(AppError::InvalidReturnItem(format!(
        "product {} does not match ordered item {}",
        product_id, ordered_item_id
      )));
    }
    let returnable = ordered_item.current_quantity;
    let total = requested.entry(ordered_item_id).or_insert(0);
    *total = match total.checked_add(quantity) {
      Some(sum) if sum <= returnable => sum,
      sum => {
        return Err(AppError::ExceedsReturnableQuantity {
          ordered_item_id,
          requested: sum.unwrap_or(i32::MAX),
          returnable,
        })
      }
    };
  }
  Ok(requested)
}

// --- Creation ---

#[instrument(name = "create_return::validate_items", skip(ctx_data), err(Display))]
async fn validate_items_step(ctx_data: ContextData<CreateReturnCtxData>) -> AppResult<PipelineControl> {
  let (reason, items): (String, Vec<ReturnItemInput>) = ctx_data.read_with(|c| (c.return_reason.clone(), c.items.clone()));

  if reason.trim().is_empty() {
    return Err(AppError::Validation("return_reason must not be empty".to_string()));
  }
  if items.is_empty() {
    return Err(AppError::Validation("A return needs at least one item".to_string()));
  }
  for item in &items {
    if item.quantity <= 0 {
      return Err(AppError::InvalidReturnItem(format!(
        "quantity for ordered item {} must be positive",
        item.ordered_item_id
      )));
    }
    if item.reason.trim().is_empty() {
      return Err(AppError::InvalidReturnItem(format!(
        "reason for ordered item {} must not be empty",
        item.ordered_item_id
      )));
    }
  }
  Ok(PipelineControl::Continue)
}

#[instrument(name = "create_return::load_order", skip(ctx_data), err(Display))]
async fn load_order_step(ctx_data: ContextData<CreateReturnCtxData>) -> AppResult<PipelineControl> {
  let (tx, user_id, order_id) = ctx_data.read_with(|c| (c.tx.clone(), c.user_id, c.order_id));

  let ordered_items = {
    let mut guard = tx.acquire().await;
    let order = guard
      .lock_order(order_id)
      .await?
      .filter(|o| o.user_id == user_id)
      .ok_or(AppError::OrderNotFound)?;
    if order.status != OrderStatus::Delivered {
      warn!(order_id, status = %order.status, "Return requested for an undelivered order.");
      return Err(AppError::OrderNotDelivered);
    }
    guard.lock_ordered_items(order_id).await?
  };

  ctx_data.write().ordered_items = ordered_items;
  Ok(PipelineControl::Continue)
}

#[instrument(name = "create_return::check_returnable", skip(ctx_data), err(Display))]
async fn check_returnable_step(ctx_data: ContextData<CreateReturnCtxData>) -> AppResult<PipelineControl> {
  ctx_data.read_with(|c| {
    let items: Vec<(i64, i64, i32)> = c
      .items
      .iter()
      .map(|i| (i.ordered_item_id, i.product_id, i.quantity))
      .collect();
    check_against_ordered(&items, &c.ordered_items)
  })?;
  Ok(PipelineControl::Continue)
}

#[instrument(name = "create_return::insert_return", skip(ctx_data), err(Display))]
async fn insert_return_step(ctx_data: ContextData<CreateReturnCtxData>) -> AppResult<PipelineControl> {
  let (tx, request, items, now) = ctx_data.read_with(|c| {
    (
      c.tx.clone(),
      NewReturn {
        user_id: c.user_id,
        order_id: c.order_id,
        return_reason: c.return_reason.trim().to_string(),
        created_at: c.now,
      },
      c.items.clone(),
      c.now,
    )
  });

  let (created, created_items) = {
    let mut guard = tx.acquire().await;
    let created = guard.insert_return(request).await?;
    let mut created_items = Vec::with_capacity(items.len());
    for item in items {
      let row = guard
        .insert_return_item(NewReturnItem {
          return_id: created.id,
          product_id: item.product_id,
          quantity: item.quantity,
          ordered_item_id: item.ordered_item_id,
          reason: item.reason,
          created_at: now,
        })
        .await?;
      created_items.push(row);
    }
    (created, created_items)
  };
  info!(return_id = created.id, order_id = created.order_id, items = created_items.len(), "Return request created.");

  ctx_data.write_with(|c| {
    c.created = Some(created);
    c.created_items = created_items;
  });
  Ok(PipelineControl::Continue)
}

// --- Resolution ---

#[instrument(name = "resolve_return::load_return", skip(ctx_data), err(Display))]
async fn load_return_step(ctx_data: ContextData<ResolveReturnCtxData>) -> AppResult<PipelineControl> {
  let (tx, return_id, decision) = ctx_data.read_with(|c| (c.tx.clone(), c.return_id, c.decision));

  if !decision.is_resolved() {
    return Err(AppError::Validation(
      "status must be Approved or Rejected".to_string(),
    ));
  }

  let (request, items) = {
    let mut guard = tx.acquire().await;
    let request = guard.lock_return(return_id).await?.ok_or(AppError::ReturnNotFound)?;
    if request.status.is_resolved() {
      warn!(return_id, status = %request.status, "Return already resolved.");
      return Err(AppError::ReturnAlreadyResolved(request.status));
    }
    let items = guard.items_of_return(return_id).await?;
    (request, items)
  };

  ctx_data.write_with(|c| {
    c.request = Some(request);
    c.items = items;
  });
  Ok(PipelineControl::Continue)
}

async fn restock(tx: &mut dyn StoreTx, order_id: i64, items: &[ReturnItem]) -> AppResult<i32> {
  // Re-checked under lock: another approval may have consumed the same ordered items.
  let ordered = tx.lock_ordered_items(order_id).await?;
  let keyed: Vec<(i64, i64, i32)> = items
    .iter()
    .map(|i| (i.ordered_item_id, i.product_id, i.quantity))
    .collect();
  let per_ordered_item = check_against_ordered(&keyed, &ordered)?;

  for (&ordered_item_id, &quantity) in &per_ordered_item {
    tx.consume_returnable(ordered_item_id, quantity).await?;
  }
  let per_product = stock_ledger::aggregate(items.iter().map(|i| (i.product_id, i.quantity)))?;
  stock_ledger::restore_many(tx, &per_product).await?;

  per_product
    .values()
    .try_fold(0i32, |acc, q| acc.checked_add(*q))
    .ok_or_else(|| AppError::Validation("Returned quantity is too large".to_string()))
}

#[instrument(name = "resolve_return::restock_items", skip(ctx_data), err(Display))]
async fn restock_items_step(ctx_data: ContextData<ResolveReturnCtxData>) -> AppResult<PipelineControl> {
  let (tx, request, items) = {
    let guard = ctx_data.read();
    (guard.tx.clone(), filled(&guard.request, "return request")?, guard.items.clone())
  };

  let total = {
    let mut guard = tx.acquire().await;
    restock(guard.as_mut(), request.order_id, &items).await?
  };
  info!(return_id = request.id, total_returned_quantity = total, "Returned items restocked.");

  ctx_data.write().total_returned_quantity = total;
  Ok(PipelineControl::Continue)
}

#[instrument(name = "resolve_return::apply_decision", skip(ctx_data), err(Display))]
async fn apply_decision_step(ctx_data: ContextData<ResolveReturnCtxData>) -> AppResult<PipelineControl> {
  let (tx, return_id, decision, total) =
    ctx_data.read_with(|c| (c.tx.clone(), c.return_id, c.decision, c.total_returned_quantity));

  let resolved = tx.acquire().await.resolve_return(return_id, decision, total).await?;
  info!(return_id, status = %resolved.status, "Return resolved.");

  ctx_data.write().resolved = Some(resolved);
  Ok(PipelineControl::Continue)
}
