use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, patch, post},
    Router,
};
use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shared::codes::next_code;
use shared::pricing::{line_total, order_total};
use shared::status::{AuditAction, OrderStatus};
use shared::Module;

use super::{created, to_details, AppState};
use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::models::*;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_orders).post(create_order))
        .route(
            "/orders/:id",
            get(get_order).patch(update_order).delete(delete_order),
        )
        .route("/orders/:id/status", patch(change_status))
        .route("/orders/:id/items", post(add_item))
        .route("/order-items/:id", delete(remove_item))
}

async fn audit(state: &AppState, user: &AuthUser, action: AuditAction, entity: &str, id: i32, details: Value) {
    state.audit(user, Module::Commercial, action, entity, Some(id), details).await;
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderQuery {
    pub status: Option<String>,
    pub customer_id: Option<i32>,
}

pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderQuery>,
) -> ApiResult<Json<Vec<Order>>> {
    user.require(Module::Commercial)?;
    let mut orders: Vec<Order> = state
        .store
        .all::<Order>()
        .await?
        .into_iter()
        .filter(|o| query.status.as_ref().map_or(true, |s| &o.data.status == s))
        .filter(|o| query.customer_id.map_or(true, |c| o.data.customer_id == c))
        .collect();
    orders.sort_by(|a, b| b.data.order_date.cmp(&a.data.order_date).then(b.id.cmp(&a.id)));
    Ok(Json(orders))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub customer: Option<Customer>,
    pub items: Vec<OrderItem>,
}

pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<Json<OrderDetail>> {
    user.require(Module::Commercial)?;
    let order = state.store.get::<Order>(id).await?;
    let customer = state.store.find::<Customer>(order.data.customer_id).await?;
    let items = state.store.order_items(id).await?;
    Ok(Json(OrderDetail { order, customer, items }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    pub product_id: i32,
    pub quantity: f64,
    pub unit_price: Option<f64>,
}

/// Prices a line. Without an explicit price the product's selling price
/// applies, or zero when it has none.
async fn price_item(state: &AppState, order_id: i32, item: NewItem) -> ApiResult<OrderItemData> {
    if !item.quantity.is_finite() || item.quantity <= 0.0 {
        return Err(ApiError::bad_request("quantity must be greater than zero"));
    }
    let product = state.store.get::<Product>(item.product_id).await?;
    let unit_price = item
        .unit_price
        .or(product.data.selling_price)
        .unwrap_or(0.0);
    if !unit_price.is_finite() || unit_price < 0.0 {
        return Err(ApiError::bad_request("unit price must not be negative"));
    }
    Ok(OrderItemData {
        order_id,
        product_id: item.product_id,
        quantity: item.quantity,
        unit_price,
        total_price: line_total(item.quantity, unit_price),
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub order_number: Option<String>,
    pub customer_id: i32,
    pub order_date: Option<NaiveDate>,
    pub delivery_date: Option<NaiveDate>,
    pub notes: Option<String>,
    #[serde(default)]
    pub items: Vec<NewItem>,
}

/// The order and its items are stored together. Numbers come as
/// `PED-<year>-NNNN` unless the request brings one.
pub async fn create_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<NewOrder>,
) -> ApiResult<(StatusCode, Json<OrderDetail>)> {
    user.require(Module::Commercial)?;
    let customer = state.store.get::<Customer>(request.customer_id).await?;
    let order_date = request.order_date.unwrap_or_else(|| Utc::now().date_naive());
    if request.delivery_date.is_some_and(|d| d < order_date) {
        return Err(ApiError::bad_request("delivery date must not precede the order date"));
    }
    let mut items = Vec::with_capacity(request.items.len());
    for item in request.items {
        items.push(price_item(&state, 0, item).await?);
    }
    let order_number = match request.order_number.filter(|n| !n.trim().is_empty()) {
        Some(number) => number.trim().to_string(),
        None => {
            let existing = state.store.all::<Order>().await?;
            next_code(
                "PED",
                order_date.year(),
                4,
                existing.iter().map(|o| o.data.order_number.as_str()),
            )
        }
    };
    let order = OrderData {
        order_number,
        customer_id: customer.id,
        order_date,
        delivery_date: request.delivery_date,
        status: OrderStatus::New.to_string(),
        total_amount: order_total(items.iter().map(|i| i.total_price)),
        notes: request.notes,
        created_by: Some(user.id),
    };
    let (order, items) = state.store.create_order(order, items).await?;
    audit(&state, &user, AuditAction::Create, "order", order.id, to_details(&order)).await;
    Ok(created(OrderDetail { order, customer: Some(customer), items }))
}

/// Header fields only. Status has its own route and the total follows the
/// items.
pub async fn update_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(changes): Json<OrderChanges>,
) -> ApiResult<Json<Order>> {
    user.require(Module::Commercial)?;
    if changes.status.is_some() {
        return Err(ApiError::bad_request("use the status route to change status"));
    }
    if changes.total_amount.is_some() {
        return Err(ApiError::bad_request("the total follows the order items"));
    }
    let current = state.store.get::<Order>(id).await?.data;
    if let Some(customer_id) = changes.customer_id {
        state.store.get::<Customer>(customer_id).await?;
    }
    let order_date = changes.order_date.unwrap_or(current.order_date);
    if changes.delivery_date.or(current.delivery_date).is_some_and(|d| d < order_date) {
        return Err(ApiError::bad_request("delivery date must not precede the order date"));
    }
    let updated = state.store.update::<Order>(id, changes.clone()).await?;
    audit(&state, &user, AuditAction::Update, "order", id, to_details(&changes)).await;
    Ok(Json(updated))
}

/// Items go with the order.
pub async fn delete_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<StatusCode> {
    user.require(Module::Commercial)?;
    state.store.delete::<Order>(id).await?;
    audit(&state, &user, AuditAction::Delete, "order", id, Value::Null).await;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub status: String,
}

pub async fn change_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(body): Json<StatusBody>,
) -> ApiResult<Json<Order>> {
    user.require(Module::Commercial)?;
    let requested: OrderStatus = body.status.parse()?;
    let current = state.store.get::<Order>(id).await?;
    let status = current.data.status.parse::<OrderStatus>()?.move_to(requested)?;
    let changes = OrderChanges { status: Some(status.to_string()), ..Default::default() };
    let updated = state.store.update::<Order>(id, changes).await?;
    audit(
        &state,
        &user,
        AuditAction::Update,
        "order",
        id,
        json!({ "status": status, "from": current.data.status }),
    )
    .await;
    Ok(Json(updated))
}

// Items

async fn editable_order(state: &AppState, order_id: i32) -> ApiResult<Order> {
    let order = state.store.get::<Order>(order_id).await?;
    if !order.data.status.parse::<OrderStatus>()?.is_editable() {
        return Err(ApiError::bad_request(format!(
            "order {} is {} and its items cannot change",
            order.data.order_number, order.data.status
        )));
    }
    Ok(order)
}

async fn refresh_total(state: &AppState, order_id: i32) -> ApiResult<Order> {
    let items = state.store.order_items(order_id).await?;
    let changes = OrderChanges {
        total_amount: Some(order_total(items.iter().map(|i| i.data.total_price))),
        ..Default::default()
    };
    Ok(state.store.update::<Order>(order_id, changes).await?)
}

#[derive(Debug, Serialize)]
pub struct ItemChange {
    pub item: OrderItem,
    pub order: Order,
}

pub async fn add_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<i32>,
    Json(request): Json<NewItem>,
) -> ApiResult<(StatusCode, Json<ItemChange>)> {
    user.require(Module::Commercial)?;
    editable_order(&state, order_id).await?;
    let item = price_item(&state, order_id, request).await?;
    let item = state.store.create::<OrderItem>(item).await?;
    let order = refresh_total(&state, order_id).await?;
    audit(&state, &user, AuditAction::Create, "order_item", item.id, to_details(&item)).await;
    Ok(created(ItemChange { item, order }))
}

pub async fn remove_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<Json<Order>> {
    user.require(Module::Commercial)?;
    let item = state.store.get::<OrderItem>(id).await?;
    editable_order(&state, item.data.order_id).await?;
    state.store.delete::<OrderItem>(id).await?;
    let order = refresh_total(&state, item.data.order_id).await?;
    audit(&state, &user, AuditAction::Delete, "order_item", id, to_details(&item)).await;
    Ok(Json(order))
}
