use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use shared::status::{AuditAction, TransactionType};
use shared::stock::is_low;
use shared::Module;

use super::{created, to_details, AppState};
use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::models::*;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/inventory/transactions", get(list_transactions).post(create_transaction))
        .route("/inventory/transactions/:id", get(get_transaction))
        .route("/inventory/low-stock", get(low_stock))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionQuery {
    pub material_id: Option<i32>,
    #[serde(rename = "type")]
    pub type_: Option<String>,
}

pub async fn list_transactions(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<TransactionQuery>,
) -> ApiResult<Json<Vec<InventoryTransaction>>> {
    user.require(Module::Inventory)?;
    if let Some(kind) = &query.type_ {
        kind.parse::<TransactionType>()?;
    }
    let mut transactions: Vec<InventoryTransaction> = state
        .store
        .all::<InventoryTransaction>()
        .await?
        .into_iter()
        .filter(|t| query.material_id.map_or(true, |m| t.data.material_id == m))
        .filter(|t| query.type_.as_ref().map_or(true, |k| &t.data.transaction_type == k))
        .collect();
    transactions.reverse();
    Ok(Json(transactions))
}

pub async fn get_transaction(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<Json<InventoryTransaction>> {
    user.require(Module::Inventory)?;
    Ok(Json(state.store.get::<InventoryTransaction>(id).await?))
}

#[derive(Debug, Serialize)]
pub struct Movement {
    pub transaction: InventoryTransaction,
    pub material: RawMaterial,
}

/// Books the movement and moves the material's stock with it. An outgoing
/// movement larger than the stock on hand is refused.
pub async fn create_transaction(
    State(state): State<AppState>,
    user: AuthUser,
    Json(mut transaction): Json<InventoryTransactionData>,
) -> ApiResult<(StatusCode, Json<Movement>)> {
    user.require(Module::Inventory)?;
    transaction.transaction_type.parse::<TransactionType>()?;
    transaction.created_by = Some(user.id);
    let (transaction, material) = state.store.record_stock_movement(transaction).await?;
    state
        .audit(
            &user,
            Module::Inventory,
            AuditAction::Create,
            "inventory_transaction",
            Some(transaction.id),
            to_details(&transaction),
        )
        .await;
    Ok(created(Movement { transaction, material }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LowStockItem {
    #[serde(flatten)]
    pub material: RawMaterial,
    pub shortfall: f64,
}

pub async fn low_stock(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<Vec<LowStockItem>>> {
    user.require(Module::Inventory)?;
    Ok(Json(low_stock_items(&state).await?))
}

/// Materials below their minimum, largest shortfall first.
pub async fn low_stock_items(state: &AppState) -> ApiResult<Vec<LowStockItem>> {
    let mut items: Vec<LowStockItem> = state
        .store
        .all::<RawMaterial>()
        .await?
        .into_iter()
        .filter(|m| is_low(m.data.current_stock, m.data.minimum_stock))
        .map(|material| LowStockItem {
            shortfall: material.data.minimum_stock - material.data.current_stock,
            material,
        })
        .collect();
    items.sort_by(|a, b| b.shortfall.total_cmp(&a.shortfall).then(a.material.id.cmp(&b.material.id)));
    Ok(items)
}
