// storefront/src/pipelines/contexts.rs

//! Context data for every workflow. Handlers receive these wrapped in `storeflow::ContextData`.
//!
//! Each context owns the `TxScope` of its run, the request input, and the fields steps fill in.

use crate::errors::{AppError, Result};
use crate::models::{Order, OrderStatus, OrderedItem, PaymentMethod, PaymentStatus, ReturnItem, ReturnRequest, ReturnStatus};
use crate::pipelines::transaction::TxScope;
use crate::services::cart_snapshot::{CartSelection, CartSnapshot};
use crate::services::discount_resolver::{DiscountRef, ResolvedDiscount};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use storeflow::{AtomicContext, TransactionBoundary};

/// Value a step needs from an earlier step.
pub(crate) fn filled<T: Clone>(value: &Option<T>, what: &str) -> Result<T> {
  value
    .clone()
    .ok_or_else(|| AppError::Internal(format!("{} was not set by an earlier step", what)))
}

// --- Order creation ---

#[derive(Debug, Clone)]
pub struct CreateOrderInput {
  pub user_id: i64,
  pub selection: CartSelection,
  pub discount: Option<DiscountRef>,
  pub address_id: i64,
  pub payment_status: PaymentStatus,
  pub payment_method: PaymentMethod,
  pub transaction_id: Option<String>,
}

pub struct CreateOrderCtxData {
  pub tx: TxScope,
  pub now: DateTime<Utc>,
  pub input: CreateOrderInput,
  pub snapshot: Option<CartSnapshot>,
  pub discount: Option<ResolvedDiscount>,
  pub order: Option<Order>,
  pub ordered_items: Vec<OrderedItem>,
}

impl CreateOrderCtxData {
  pub fn new(tx: TxScope, input: CreateOrderInput) -> Self {
    Self {
      tx,
      now: Utc::now(),
      input,
      snapshot: None,
      discount: None,
      order: None,
      ordered_items: Vec::new(),
    }
  }
}

// --- Order status ---

/// Who asked for a status change. Users may only touch their own orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
  User(i64),
  Admin,
}

pub struct OrderStatusCtxData {
  pub tx: TxScope,
  pub actor: Actor,
  pub order_id: i64,
  pub target: OrderStatus,
  pub order: Option<Order>,
  /// Units given back per product when the order is cancelled.
  pub restored: BTreeMap<i64, i32>,
}

impl OrderStatusCtxData {
  pub fn new(tx: TxScope, actor: Actor, order_id: i64, target: OrderStatus) -> Self {
    Self {
      tx,
      actor,
      order_id,
      target,
      order: None,
      restored: BTreeMap::new(),
    }
  }
}

// --- Returns ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnItemInput {
  pub product_id: i64,
  pub quantity: i32,
  pub reason: String,
  pub ordered_item_id: i64,
}

pub struct CreateReturnCtxData {
  pub tx: TxScope,
  pub now: DateTime<Utc>,
  pub user_id: i64,
  pub order_id: i64,
  pub return_reason: String,
  pub items: Vec<ReturnItemInput>,
  pub ordered_items: Vec<OrderedItem>,
  pub created: Option<ReturnRequest>,
  pub created_items: Vec<ReturnItem>,
}

impl CreateReturnCtxData {
  pub fn new(tx: TxScope, user_id: i64, order_id: i64, return_reason: String, items: Vec<ReturnItemInput>) -> Self {
    Self {
      tx,
      now: Utc::now(),
      user_id,
      order_id,
      return_reason,
      items,
      ordered_items: Vec::new(),
      created: None,
      created_items: Vec::new(),
    }
  }
}

pub struct ResolveReturnCtxData {
  pub tx: TxScope,
  pub return_id: i64,
  pub decision: ReturnStatus,
  /// The return as loaded, before the decision.
  pub request: Option<ReturnRequest>,
  pub items: Vec<ReturnItem>,
  pub total_returned_quantity: i32,
  pub resolved: Option<ReturnRequest>,
}

impl ResolveReturnCtxData {
  pub fn new(tx: TxScope, return_id: i64, decision: ReturnStatus) -> Self {
    Self {
      tx,
      return_id,
      decision,
      request: None,
      items: Vec::new(),
      total_returned_quantity: 0,
      resolved: None,
    }
  }
}

macro_rules! atomic_context {
  ($($ctx:ty),+ $(,)?) => {
    $(
      impl AtomicContext for $ctx {
        fn boundary(&self) -> Arc<dyn TransactionBoundary> {
          self.tx.boundary()
        }
      }
    )+
  };
}

atomic_context!(
  CreateOrderCtxData,
  OrderStatusCtxData,
  CreateReturnCtxData,
  ResolveReturnCtxData
);
