use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, patch},
    Router,
};
use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shared::codes::next_code;
use shared::status::{AuditAction, ProductionStatus};
use shared::Module;

use super::{created, require_text, to_details, AppState};
use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::models::*;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/production-orders", get(list_orders).post(create_order))
        .route(
            "/production-orders/:id",
            get(get_order).patch(update_order).delete(delete_order),
        )
        .route("/production-orders/:id/status", patch(change_status))
        .route("/production-orders/:id/losses", get(list_losses).post(create_loss))
        .route("/production-losses/:id", delete(delete_loss))
}

async fn audit(state: &AppState, user: &AuthUser, action: AuditAction, entity: &str, id: i32, details: Value) {
    state.audit(user, Module::Production, action, entity, Some(id), details).await;
}

fn check_quantity(quantity: f64) -> ApiResult<()> {
    if !quantity.is_finite() || quantity <= 0.0 {
        return Err(ApiError::bad_request("quantity must be greater than zero"));
    }
    Ok(())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderQuery {
    pub status: Option<String>,
    pub product_id: Option<i32>,
}

pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderQuery>,
) -> ApiResult<Json<Vec<ProductionOrder>>> {
    user.require(Module::Production)?;
    if let Some(status) = &query.status {
        status.parse::<ProductionStatus>()?;
    }
    let mut orders: Vec<ProductionOrder> = state
        .store
        .all::<ProductionOrder>()
        .await?
        .into_iter()
        .filter(|o| query.status.as_ref().map_or(true, |s| &o.data.status == s))
        .filter(|o| query.product_id.map_or(true, |p| o.data.product_id == p))
        .collect();
    orders.reverse();
    Ok(Json(orders))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: ProductionOrder,
    pub product: Option<Product>,
    pub losses: Vec<ProductionLoss>,
    pub total_loss: f64,
}

pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<Json<OrderDetail>> {
    user.require(Module::Production)?;
    let order = state.store.get::<ProductionOrder>(id).await?;
    let product = state.store.find::<Product>(order.data.product_id).await?;
    let losses = state.store.production_losses(id).await?;
    let total_loss = losses.iter().map(|l| l.data.quantity).sum();
    Ok(Json(OrderDetail { order, product, losses, total_loss }))
}

/// Numbers come as `OP-<year>-NNNN` unless the request brings one.
pub async fn create_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(mut order): Json<ProductionOrderData>,
) -> ApiResult<(StatusCode, Json<ProductionOrder>)> {
    user.require(Module::Production)?;
    check_quantity(order.quantity)?;
    let status: ProductionStatus = order.status.parse()?;
    if status.is_closed() {
        return Err(ApiError::bad_request(format!("a new production order cannot be {status}")));
    }
    state.store.get::<Product>(order.product_id).await?;
    check_dates(order.start_date, order.end_date)?;
    if order.order_number.trim().is_empty() {
        let year = order.start_date.unwrap_or_else(|| Utc::now().date_naive()).year();
        let existing = state.store.all::<ProductionOrder>().await?;
        order.order_number = next_code(
            "OP",
            year,
            4,
            existing.iter().map(|o| o.data.order_number.as_str()),
        );
    }
    order.created_by = Some(user.id);
    let stored = state.store.create::<ProductionOrder>(order).await?;
    audit(&state, &user, AuditAction::Create, "production_order", stored.id, to_details(&stored)).await;
    Ok(created(stored))
}

fn check_dates(start: Option<NaiveDate>, end: Option<NaiveDate>) -> ApiResult<()> {
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            return Err(ApiError::bad_request("end date must not precede start date"));
        }
    }
    Ok(())
}

/// Status moves through the status route only.
pub async fn update_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(changes): Json<ProductionOrderChanges>,
) -> ApiResult<Json<ProductionOrder>> {
    user.require(Module::Production)?;
    if changes.status.is_some() {
        return Err(ApiError::bad_request("use the status route to change status"));
    }
    let current = state.store.get::<ProductionOrder>(id).await?.data;
    if current.status.parse::<ProductionStatus>()?.is_closed() {
        return Err(ApiError::bad_request(format!(
            "production order {} is {} and cannot change",
            current.order_number, current.status
        )));
    }
    if let Some(quantity) = changes.quantity {
        check_quantity(quantity)?;
    }
    if let Some(product_id) = changes.product_id {
        state.store.get::<Product>(product_id).await?;
    }
    check_dates(
        changes.start_date.or(current.start_date),
        changes.end_date.or(current.end_date),
    )?;
    let updated = state.store.update::<ProductionOrder>(id, changes.clone()).await?;
    audit(&state, &user, AuditAction::Update, "production_order", id, to_details(&changes)).await;
    Ok(Json(updated))
}

/// Losses go with the order.
pub async fn delete_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<StatusCode> {
    user.require(Module::Production)?;
    state.store.delete::<ProductionOrder>(id).await?;
    audit(&state, &user, AuditAction::Delete, "production_order", id, Value::Null).await;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub status: String,
}

/// Starting stamps the start date and completing stamps the end date,
/// unless they are already set.
pub async fn change_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(body): Json<StatusBody>,
) -> ApiResult<Json<ProductionOrder>> {
    user.require(Module::Production)?;
    let requested: ProductionStatus = body.status.parse()?;
    let current = state.store.get::<ProductionOrder>(id).await?;
    let status = current.data.status.parse::<ProductionStatus>()?.move_to(requested)?;
    let today = Utc::now().date_naive();
    let mut changes = ProductionOrderChanges { status: Some(status.to_string()), ..Default::default() };
    match status {
        ProductionStatus::InProgress if current.data.start_date.is_none() => changes.start_date = Some(today),
        ProductionStatus::Completed if current.data.end_date.is_none() => changes.end_date = Some(today),
        _ => {}
    }
    let updated = state.store.update::<ProductionOrder>(id, changes).await?;
    audit(
        &state,
        &user,
        AuditAction::Update,
        "production_order",
        id,
        json!({ "status": status, "from": current.data.status }),
    )
    .await;
    Ok(Json(updated))
}

// Losses

pub async fn list_losses(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<i32>,
) -> ApiResult<Json<Vec<ProductionLoss>>> {
    user.require(Module::Production)?;
    state.store.get::<ProductionOrder>(order_id).await?;
    Ok(Json(state.store.production_losses(order_id).await?))
}

pub async fn create_loss(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<i32>,
    Json(mut loss): Json<ProductionLossData>,
) -> ApiResult<(StatusCode, Json<ProductionLoss>)> {
    user.require(Module::Production)?;
    check_quantity(loss.quantity)?;
    require_text(&loss.reason, "reason", 1)?;
    state.store.get::<ProductionOrder>(order_id).await?;
    loss.production_order_id = order_id;
    loss.created_by = Some(user.id);
    let stored = state.store.create::<ProductionLoss>(loss).await?;
    audit(&state, &user, AuditAction::Create, "production_loss", stored.id, to_details(&stored)).await;
    Ok(created(stored))
}

pub async fn delete_loss(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<StatusCode> {
    user.require(Module::Production)?;
    state.store.delete::<ProductionLoss>(id).await?;
    audit(&state, &user, AuditAction::Delete, "production_loss", id, Value::Null).await;
    Ok(StatusCode::NO_CONTENT)
}
