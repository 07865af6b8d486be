// storefront/src/web/handlers/order_handlers.rs

use crate::errors::{AppError, Result as AppResult};
use crate::models::{OrderStatus, PaymentMethod, PaymentStatus};
use crate::pipelines::contexts::{filled, Actor, CreateOrderCtxData, CreateOrderInput, OrderStatusCtxData};
use crate::pipelines::TxScope;
use crate::services::cart_snapshot::CartSelection;
use crate::services::discount_resolver::DiscountRef;
use crate::state::AppState;
use crate::web::extractors::{AdminUser, AuthenticatedUser};
use crate::web::handlers::run_workflow;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use storeflow::ContextData;
use tracing::{info, instrument};

// --- Request DTOs ---

#[derive(Deserialize, Debug)]
pub struct CreateOrderPayload {
  #[serde(default)]
  pub cart_item_ids: Option<Vec<i64>>,
  #[serde(default)]
  pub cart_id: Option<i64>,
  pub address_id: i64,
  #[serde(default)]
  pub discount_id: Option<i64>,
  #[serde(default)]
  pub discount_code: Option<String>,
  pub payment_status: PaymentStatus,
  pub payment_method: PaymentMethod,
  #[serde(default)]
  pub transaction_id: Option<String>,
}

impl CreateOrderPayload {
  pub fn validate(&self) -> AppResult<(CartSelection, Option<DiscountRef>)> {
    let selection = match (&self.cart_item_ids, self.cart_id) {
      (Some(_), Some(_)) => {
        return Err(AppError::Validation(
          "Provide either cart_item_ids or cart_id, not both".to_string(),
        ))
      }
      (None, None) => return Err(AppError::Validation("cart_item_ids or cart_id is required".to_string())),
      (Some(ids), None) => {
        if ids.is_empty() {
          return Err(AppError::Validation("cart_item_ids must not be empty".to_string()));
        }
        if ids.iter().any(|id| *id <= 0) {
          return Err(AppError::Validation("cart_item_ids must be positive".to_string()));
        }
        CartSelection::Items(ids.clone())
      }
      (None, Some(cart_id)) if cart_id > 0 => CartSelection::Cart(cart_id),
      (None, Some(_)) => return Err(AppError::Validation("cart_id must be positive".to_string())),
    };

    if self.address_id <= 0 {
      return Err(AppError::Validation("address_id must be positive".to_string()));
    }

    let discount = match (self.discount_id, self.discount_code.as_deref().map(str::trim)) {
      (Some(_), Some(_)) => {
        return Err(AppError::Validation(
          "Provide either discount_id or discount_code, not both".to_string(),
        ))
      }
      (Some(id), None) if id > 0 => Some(DiscountRef::Id(id)),
      (Some(_), None) => return Err(AppError::Validation("discount_id must be positive".to_string())),
      (None, Some("")) => return Err(AppError::Validation("discount_code must not be empty".to_string())),
      (None, Some(code)) => Some(DiscountRef::Code(code.to_string())),
      (None, None) => None,
    };

    if self.transaction_id.as_deref().is_some_and(|t| t.len() > 255) {
      return Err(AppError::Validation("transaction_id is too long".to_string()));
    }
    Ok((selection, discount))
  }
}

/// `order_id` from the query string or the JSON body.
#[derive(Deserialize, Debug, Default)]
pub struct OrderIdPayload {
  pub order_id: Option<i64>,
}

fn order_id_from(query: OrderIdPayload, body: Option<web::Json<OrderIdPayload>>) -> AppResult<i64> {
  query
    .order_id
    .or_else(|| body.and_then(|b| b.into_inner().order_id))
    .filter(|id| *id > 0)
    .ok_or_else(|| AppError::Validation("Order ID is required".to_string()))
}

#[derive(Deserialize, Debug)]
pub struct UpdateOrderStatusPayload {
  pub order_id: Option<i64>,
  pub status: Option<OrderStatus>,
}

impl UpdateOrderStatusPayload {
  pub fn validate(&self) -> AppResult<(i64, OrderStatus)> {
    match (self.order_id.filter(|id| *id > 0), self.status) {
      (Some(order_id), Some(status)) => Ok((order_id, status)),
      _ => Err(AppError::Validation("Order ID and status are required".to_string())),
    }
  }
}

// --- Handlers ---

#[instrument(name = "handler::create_order", skip(app_state, payload), fields(user_id = auth_user.user_id))]
pub async fn create_order_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<CreateOrderPayload>,
  auth_user: AuthenticatedUser,
) -> AppResult<HttpResponse> {
  let payload = payload.into_inner();
  let (selection, discount) = payload.validate()?;
  let input = CreateOrderInput {
    user_id: auth_user.user_id,
    selection,
    discount,
    address_id: payload.address_id,
    payment_status: payload.payment_status,
    payment_method: payload.payment_method,
    transaction_id: payload.transaction_id,
  };

  let tx = TxScope::begin(app_state.store.as_ref()).await?;
  let ctx_data = ContextData::new(CreateOrderCtxData::new(tx, input));
  run_workflow(&app_state, ctx_data.clone()).await?;

  let (order, items) = {
    let guard = ctx_data.read();
    (filled(&guard.order, "order")?, guard.ordered_items.clone())
  };
  info!(order_id = order.id, net_amount = %order.net_amount, "Order created.");
  Ok(HttpResponse::Created().json(json!({
    "message": "Order created successfully",
    "order": order,
    "items": items,
  })))
}

#[instrument(name = "handler::user_orders", skip(app_state), fields(user_id = auth_user.user_id))]
pub async fn user_orders_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> AppResult<HttpResponse> {
  let orders = app_state.store.orders_for_user(auth_user.user_id).await?;
  Ok(HttpResponse::Ok().json(json!({
    "message": "Orders retrieved successfully",
    "orders": orders,
  })))
}

#[instrument(name = "handler::order_details", skip(app_state, query, body), fields(user_id = auth_user.user_id))]
pub async fn order_details_handler(
  app_state: web::Data<AppState>,
  query: web::Query<OrderIdPayload>,
  body: Option<web::Json<OrderIdPayload>>,
  auth_user: AuthenticatedUser,
) -> AppResult<HttpResponse> {
  let order_id = order_id_from(query.into_inner(), body)?;
  let details = app_state
    .store
    .order_details(auth_user.user_id, order_id)
    .await?
    .ok_or(AppError::OrderNotFound)?;
  Ok(HttpResponse::Ok().json(json!({
    "message": "Order retrieved successfully",
    "order": details,
  })))
}

#[instrument(name = "handler::all_orders", skip(app_state), fields(admin_id = admin.user_id))]
pub async fn all_orders_handler(app_state: web::Data<AppState>, admin: AdminUser) -> AppResult<HttpResponse> {
  let orders = app_state.store.all_orders().await?;
  Ok(HttpResponse::Ok().json(json!({
    "message": "All orders retrieved successfully",
    "orders": orders,
  })))
}

async fn change_status(app_state: &AppState, actor: Actor, order_id: i64, target: OrderStatus) -> AppResult<HttpResponse> {
  let tx = TxScope::begin(app_state.store.as_ref()).await?;
  let ctx_data = ContextData::new(OrderStatusCtxData::new(tx, actor, order_id, target));
  run_workflow(app_state, ctx_data.clone()).await?;

  let order = ctx_data.read_with(|c| filled(&c.order, "order"))?;
  info!(order_id, status = %order.status, "Order status changed.");
  let message = match target {
    OrderStatus::Cancelled => "Order cancelled successfully",
    _ => "Order status updated successfully",
  };
  Ok(HttpResponse::Ok().json(json!({ "message": message, "order": order })))
}

#[instrument(name = "handler::update_order_status", skip(app_state, payload), fields(admin_id = admin.user_id))]
pub async fn update_order_status_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<UpdateOrderStatusPayload>,
  admin: AdminUser,
) -> AppResult<HttpResponse> {
  let (order_id, status) = payload.validate()?;
  change_status(&app_state, Actor::Admin, order_id, status).await
}

#[instrument(name = "handler::cancel_order", skip(app_state, query, body), fields(user_id = auth_user.user_id))]
pub async fn cancel_order_handler(
  app_state: web::Data<AppState>,
  query: web::Query<OrderIdPayload>,
  body: Option<web::Json<OrderIdPayload>>,
  auth_user: AuthenticatedUser,
) -> AppResult<HttpResponse> {
  let order_id = order_id_from(query.into_inner(), body)?;
  change_status(&app_state, Actor::User(auth_user.user_id), order_id, OrderStatus::Cancelled).await
}
