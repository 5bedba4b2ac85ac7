use axum::{extract::State, response::Json, routing::get, Router};
use serde::Serialize;
use shared::status::{AccountStatus, AccountType, Level, MaintenanceStatus, ProductionStatus};
use shared::tax::round_cents;
use shared::Module;

use super::inventory::{low_stock_items, LowStockItem};
use super::AppState;
use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::models::*;

const RECENT: usize = 3;

pub fn routes() -> Router<AppState> {
    Router::new().route("/dashboard", get(dashboard))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductionSummary {
    pub count: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub planned: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceSummary {
    pub open_count: usize,
    pub urgent_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventorySummary {
    pub low_stock_count: usize,
    pub low_stock_items: Vec<LowStockItem>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialSummary {
    pub receivable_total: f64,
    pub upcoming_payments: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub production: ProductionSummary,
    pub maintenance: MaintenanceSummary,
    pub inventory: InventorySummary,
    pub financial: FinancialSummary,
    pub recent_orders: Vec<ProductionOrder>,
    pub recent_maintenance_orders: Vec<MaintenanceOrder>,
    pub recent_accounts: Vec<Account>,
}

/// The newest rows first.
fn recent<T: Clone>(rows: &[T]) -> Vec<T> {
    rows.iter().rev().take(RECENT).cloned().collect()
}

pub async fn dashboard(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<Dashboard>> {
    user.require(Module::Dashboard)?;
    let production_orders = state.store.all::<ProductionOrder>().await?;
    let maintenance_orders = state.store.all::<MaintenanceOrder>().await?;
    let accounts = state.store.all::<Account>().await?;
    let low_stock = low_stock_items(&state).await?;

    let with_status = |status: ProductionStatus| {
        production_orders
            .iter()
            .filter(|o| o.data.status == status.as_str())
            .count()
    };
    let open: Vec<&MaintenanceOrder> = maintenance_orders
        .iter()
        .filter(|o| o.data.status != MaintenanceStatus::Completed.as_str())
        .collect();
    let receivable_total = accounts
        .iter()
        .filter(|a| a.data.type_ == AccountType::Receivable.as_str())
        .map(|a| a.data.amount)
        .sum();

    Ok(Json(Dashboard {
        production: ProductionSummary {
            count: production_orders.len(),
            in_progress: with_status(ProductionStatus::InProgress),
            completed: with_status(ProductionStatus::Completed),
            planned: with_status(ProductionStatus::Planned),
        },
        maintenance: MaintenanceSummary {
            open_count: open.len(),
            urgent_count: open.iter().filter(|o| o.data.urgency == Level::High.as_str()).count(),
        },
        inventory: InventorySummary { low_stock_count: low_stock.len(), low_stock_items: low_stock },
        financial: FinancialSummary {
            receivable_total: round_cents(receivable_total),
            upcoming_payments: accounts
                .iter()
                .filter(|a| {
                    a.data.type_ == AccountType::Payable.as_str()
                        && a.data.status == AccountStatus::Pending.as_str()
                })
                .count(),
        },
        recent_orders: recent(&production_orders),
        recent_maintenance_orders: recent(&maintenance_orders),
        recent_accounts: recent(&accounts),
    }))
}
