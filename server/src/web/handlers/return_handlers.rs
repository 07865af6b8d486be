// storefront/src/web/handlers/return_handlers.rs

use crate::errors::{AppError, Result as AppResult};
use crate::models::ReturnStatus;
use crate::pipelines::contexts::{filled, CreateReturnCtxData, ResolveReturnCtxData, ReturnItemInput};
use crate::pipelines::TxScope;
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
pub struct ReturnRequestPayload {
  pub return_reason: String,
  pub order_id: i64,
}

#[derive(Deserialize, Debug)]
pub struct ReturnItemPayload {
  pub product_id: i64,
  pub quantity: i32,
  pub reason: String,
  pub ordered_item_id: i64,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateReturnPayload {
  pub return_request: Option<ReturnRequestPayload>,
  pub return_items: Option<Vec<ReturnItemPayload>>,
}

impl CreateReturnPayload {
  pub fn validate(self) -> AppResult<(ReturnRequestPayload, Vec<ReturnItemInput>)> {
    let (Some(request), Some(items)) = (self.return_request, self.return_items) else {
      return Err(AppError::Validation(
        "Missing returnRequest or returnItems in request body".to_string(),
      ));
    };
    if request.order_id <= 0 {
      return Err(AppError::Validation("order_id must be positive".to_string()));
    }
    if request.return_reason.trim().is_empty() {
      return Err(AppError::Validation("return_reason must not be empty".to_string()));
    }
    if items.is_empty() {
      return Err(AppError::Validation("returnItems must not be empty".to_string()));
    }
    let items = items
      .into_iter()
      .map(|i| ReturnItemInput {
        product_id: i.product_id,
        quantity: i.quantity,
        reason: i.reason,
        ordered_item_id: i.ordered_item_id,
      })
      .collect();
    Ok((request, items))
  }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ResolveReturnPayload {
  pub return_id: Option<i64>,
  pub status: Option<ReturnStatus>,
}

impl ResolveReturnPayload {
  pub fn validate(&self) -> AppResult<(i64, ReturnStatus)> {
    match (self.return_id.filter(|id| *id > 0), self.status) {
      (Some(_), Some(ReturnStatus::Pending)) => Err(AppError::Validation(
        "status must be Approved or Rejected".to_string(),
      )),
      (Some(return_id), Some(status)) => Ok((return_id, status)),
      _ => Err(AppError::Validation("Return ID and status are required".to_string())),
    }
  }
}

/// `returnId` from the query string or the JSON body.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReturnIdPayload {
  pub return_id: Option<i64>,
}

fn return_id_from(query: ReturnIdPayload, body: Option<web::Json<ReturnIdPayload>>) -> AppResult<i64> {
  query
    .return_id
    .or_else(|| body.and_then(|b| b.into_inner().return_id))
    .filter(|id| *id > 0)
    .ok_or_else(|| AppError::Validation("Return ID is required".to_string()))
}

// --- Handlers ---

#[instrument(name = "handler::create_return", skip(app_state, payload), fields(user_id = auth_user.user_id))]
pub async fn create_return_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<CreateReturnPayload>,
  auth_user: AuthenticatedUser,
) -> AppResult<HttpResponse> {
  let (request, items) = payload.into_inner().validate()?;

  let tx = TxScope::begin(app_state.store.as_ref()).await?;
  let ctx_data = ContextData::new(CreateReturnCtxData::new(
    tx,
    auth_user.user_id,
    request.order_id,
    request.return_reason,
    items,
  ));
  run_workflow(&app_state, ctx_data.clone()).await?;

  let created = ctx_data.read_with(|c| filled(&c.created, "return request"))?;
  info!(return_id = created.id, "Return request created.");
  Ok(HttpResponse::Created().json(json!({
    "message": "Return request created successfully",
    "returnId": created.id,
  })))
}

#[instrument(name = "handler::resolve_return", skip(app_state, payload), fields(admin_id = admin.user_id))]
pub async fn resolve_return_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<ResolveReturnPayload>,
  admin: AdminUser,
) -> AppResult<HttpResponse> {
  let (return_id, status) = payload.validate()?;

  let tx = TxScope::begin(app_state.store.as_ref()).await?;
  let ctx_data = ContextData::new(ResolveReturnCtxData::new(tx, return_id, status));
  run_workflow(&app_state, ctx_data.clone()).await?;

  let resolved = ctx_data.read_with(|c| filled(&c.resolved, "resolved return"))?;
  Ok(HttpResponse::Ok().json(json!({
    "message": "Return status updated successfully",
    "return": {
      "return_id": resolved.id,
      "status": resolved.status,
      "total_returned_quantity": resolved.total_returned_quantity,
    },
  })))
}

#[instrument(name = "handler::all_returns", skip(app_state), fields(admin_id = admin.user_id))]
pub async fn all_returns_handler(app_state: web::Data<AppState>, admin: AdminUser) -> AppResult<HttpResponse> {
  let returns = app_state.store.all_returns().await?;
  Ok(HttpResponse::Ok().json(json!({
    "message": "All return requests retrieved successfully",
    "returns": returns,
  })))
}

#[instrument(name = "handler::return_details", skip(app_state, query, body), fields(admin_id = admin.user_id))]
pub async fn return_details_handler(
  app_state: web::Data<AppState>,
  query: web::Query<ReturnIdPayload>,
  body: Option<web::Json<ReturnIdPayload>>,
  admin: AdminUser,
) -> AppResult<HttpResponse> {
  let return_id = return_id_from(query.into_inner(), body)?;
  let items = app_state.store.return_items(return_id).await?;
  if items.is_empty() {
    return Err(AppError::NotFound(format!("No items found for return {}", return_id)));
  }
  Ok(HttpResponse::Ok().json(json!({
    "message": "Return details retrieved successfully",
    "items": items,
  })))
}

#[instrument(name = "handler::user_return_items", skip(app_state, query, body), fields(user_id = auth_user.user_id))]
pub async fn user_return_items_handler(
  app_state: web::Data<AppState>,
  query: web::Query<ReturnIdPayload>,
  body: Option<web::Json<ReturnIdPayload>>,
  auth_user: AuthenticatedUser,
) -> AppResult<HttpResponse> {
  let return_id = return_id_from(query.into_inner(), body)?;
  let items = app_state.store.return_items_for_user(return_id, auth_user.user_id).await?;
  if items.is_empty() {
    return Err(AppError::NotFound(format!("No items found for return {}", return_id)));
  }
  Ok(HttpResponse::Ok().json(json!({
    "message": "Return items retrieved successfully",
    "items": items,
  })))
}
