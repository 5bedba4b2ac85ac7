use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, patch},
    Router,
};
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shared::codes::next_code;
use shared::status::{AuditAction, EquipmentStatus, Level, MaintenanceStatus, MaintenanceType};
use shared::Module;

use super::{created, require_text, to_details, AppState};
use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::models::*;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/equipment", get(list_equipment).post(create_equipment))
        .route(
            "/equipment/:id",
            get(get_equipment).patch(update_equipment).delete(delete_equipment),
        )
        .route("/maintenance-orders", get(list_orders).post(create_order))
        .route(
            "/maintenance-orders/:id",
            get(get_order).patch(update_order).delete(delete_order),
        )
        .route("/maintenance-orders/:id/status", patch(change_status))
}

async fn audit(state: &AppState, user: &AuthUser, action: AuditAction, entity: &str, id: i32, details: Value) {
    state.audit(user, Module::Maintenance, action, entity, Some(id), details).await;
}

// Equipment

fn check_equipment_kinds(criticality: Option<&str>, status: Option<&str>) -> ApiResult<()> {
    if let Some(criticality) = criticality {
        criticality.parse::<Level>()?;
    }
    if let Some(status) = status {
        status.parse::<EquipmentStatus>()?;
    }
    Ok(())
}

#[derive(Debug, Default, Deserialize)]
pub struct EquipmentQuery {
    pub sector: Option<String>,
    pub status: Option<String>,
}

pub async fn list_equipment(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<EquipmentQuery>,
) -> ApiResult<Json<Vec<Equipment>>> {
    user.require(Module::Maintenance)?;
    let mut equipment: Vec<Equipment> = state
        .store
        .all::<Equipment>()
        .await?
        .into_iter()
        .filter(|e| query.sector.as_ref().map_or(true, |s| &e.data.sector == s))
        .filter(|e| query.status.as_ref().map_or(true, |s| &e.data.status == s))
        .collect();
    equipment.sort_by(|a, b| a.data.name.cmp(&b.data.name));
    Ok(Json(equipment))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentDetail {
    #[serde(flatten)]
    pub equipment: Equipment,
    pub maintenance_orders: Vec<MaintenanceOrder>,
}

pub async fn get_equipment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<Json<EquipmentDetail>> {
    user.require(Module::Maintenance)?;
    let equipment = state.store.get::<Equipment>(id).await?;
    let mut maintenance_orders: Vec<MaintenanceOrder> = state
        .store
        .all::<MaintenanceOrder>()
        .await?
        .into_iter()
        .filter(|o| o.data.equipment_id == id)
        .collect();
    maintenance_orders.reverse();
    Ok(Json(EquipmentDetail { equipment, maintenance_orders }))
}

pub async fn create_equipment(
    State(state): State<AppState>,
    user: AuthUser,
    Json(mut equipment): Json<EquipmentData>,
) -> ApiResult<(StatusCode, Json<Equipment>)> {
    user.require(Module::Maintenance)?;
    require_text(&equipment.name, "name", 1)?;
    require_text(&equipment.sector, "sector", 1)?;
    require_text(&equipment.type_, "type", 1)?;
    check_equipment_kinds(Some(&equipment.criticality), Some(&equipment.status))?;
    equipment.created_by = Some(user.id);
    let stored = state.store.create::<Equipment>(equipment).await?;
    audit(&state, &user, AuditAction::Create, "equipment", stored.id, to_details(&stored)).await;
    Ok(created(stored))
}

pub async fn update_equipment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(changes): Json<EquipmentChanges>,
) -> ApiResult<Json<Equipment>> {
    user.require(Module::Maintenance)?;
    check_equipment_kinds(changes.criticality.as_deref(), changes.status.as_deref())?;
    if let Some(name) = &changes.name {
        require_text(name, "name", 1)?;
    }
    let updated = state.store.update::<Equipment>(id, changes.clone()).await?;
    audit(&state, &user, AuditAction::Update, "equipment", id, to_details(&changes)).await;
    Ok(Json(updated))
}

/// Refused while maintenance orders point at the equipment.
pub async fn delete_equipment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<StatusCode> {
    user.require(Module::Maintenance)?;
    state.store.delete::<Equipment>(id).await?;
    audit(&state, &user, AuditAction::Delete, "equipment", id, Value::Null).await;
    Ok(StatusCode::NO_CONTENT)
}

// Maintenance orders

fn check_order_kinds(kind: Option<&str>, urgency: Option<&str>) -> ApiResult<()> {
    if let Some(kind) = kind {
        kind.parse::<MaintenanceType>()?;
    }
    if let Some(urgency) = urgency {
        urgency.parse::<Level>()?;
    }
    Ok(())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderQuery {
    pub status: Option<String>,
    pub equipment_id: Option<i32>,
}

pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderQuery>,
) -> ApiResult<Json<Vec<MaintenanceOrder>>> {
    user.require(Module::Maintenance)?;
    let mut orders: Vec<MaintenanceOrder> = state
        .store
        .all::<MaintenanceOrder>()
        .await?
        .into_iter()
        .filter(|o| query.status.as_ref().map_or(true, |s| &o.data.status == s))
        .filter(|o| query.equipment_id.map_or(true, |e| o.data.equipment_id == e))
        .collect();
    orders.reverse();
    Ok(Json(orders))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: MaintenanceOrder,
    pub equipment: Option<Equipment>,
}

pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<Json<OrderDetail>> {
    user.require(Module::Maintenance)?;
    let order = state.store.get::<MaintenanceOrder>(id).await?;
    let equipment = state.store.find::<Equipment>(order.data.equipment_id).await?;
    Ok(Json(OrderDetail { order, equipment }))
}

/// Numbers come as `OM-<year>-NNNN` unless the request brings one.
pub async fn create_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(mut order): Json<MaintenanceOrderData>,
) -> ApiResult<(StatusCode, Json<MaintenanceOrder>)> {
    user.require(Module::Maintenance)?;
    require_text(&order.description, "description", 1)?;
    check_order_kinds(Some(&order.type_), Some(&order.urgency))?;
    let status: MaintenanceStatus = order.status.parse()?;
    state.store.get::<Equipment>(order.equipment_id).await?;
    if status == MaintenanceStatus::Completed && order.completion_date.is_none() {
        order.completion_date = Some(Utc::now().date_naive());
    }
    if order.order_number.trim().is_empty() {
        let year = order.scheduled_date.unwrap_or_else(|| Utc::now().date_naive()).year();
        let existing = state.store.all::<MaintenanceOrder>().await?;
        order.order_number = next_code(
            "OM",
            year,
            4,
            existing.iter().map(|o| o.data.order_number.as_str()),
        );
    }
    order.created_by = Some(user.id);
    let stored = state.store.create::<MaintenanceOrder>(order).await?;
    audit(&state, &user, AuditAction::Create, "maintenance_order", stored.id, to_details(&stored)).await;
    Ok(created(stored))
}

pub async fn update_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(changes): Json<MaintenanceOrderChanges>,
) -> ApiResult<Json<MaintenanceOrder>> {
    user.require(Module::Maintenance)?;
    if changes.status.is_some() {
        return Err(ApiError::bad_request("use the status route to change status"));
    }
    check_order_kinds(changes.type_.as_deref(), changes.urgency.as_deref())?;
    if let Some(equipment_id) = changes.equipment_id {
        state.store.get::<Equipment>(equipment_id).await?;
    }
    let updated = state.store.update::<MaintenanceOrder>(id, changes.clone()).await?;
    audit(&state, &user, AuditAction::Update, "maintenance_order", id, to_details(&changes)).await;
    Ok(Json(updated))
}

pub async fn delete_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<StatusCode> {
    user.require(Module::Maintenance)?;
    state.store.delete::<MaintenanceOrder>(id).await?;
    audit(&state, &user, AuditAction::Delete, "maintenance_order", id, Value::Null).await;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub status: String,
}

/// Completing stamps today as the completion date; leaving completed is
/// refused, and any other move clears a stale date.
pub async fn change_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(body): Json<StatusBody>,
) -> ApiResult<Json<MaintenanceOrder>> {
    user.require(Module::Maintenance)?;
    let requested: MaintenanceStatus = body.status.parse()?;
    let current = state.store.get::<MaintenanceOrder>(id).await?;
    let status = current.data.status.parse::<MaintenanceStatus>()?.move_to(requested)?;
    let completion_date = match status {
        MaintenanceStatus::Completed => Some(current.data.completion_date.or(Some(Utc::now().date_naive()))),
        _ if current.data.completion_date.is_some() => Some(None),
        _ => None,
    };
    let changes = MaintenanceOrderChanges {
        status: Some(status.to_string()),
        completion_date,
        ..Default::default()
    };
    let updated = state.store.update::<MaintenanceOrder>(id, changes).await?;
    audit(
        &state,
        &user,
        AuditAction::Update,
        "maintenance_order",
        id,
        json!({ "status": status, "from": current.data.status }),
    )
    .await;
    Ok(Json(updated))
}
