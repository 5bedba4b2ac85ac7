use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, patch},
    Router,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use shared::status::{AccountStatus, AccountType, AuditAction};
use shared::Module;

use super::{created, require_text, to_details, AppState};
use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::models::*;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/expenses", get(list_expenses).post(create_expense))
        .route(
            "/expenses/:id",
            get(get_expense).patch(update_expense).delete(delete_expense),
        )
        .route("/expenses/:id/pay", patch(pay_expense))
        .route("/accounts", get(list_accounts).post(create_account))
        .route(
            "/accounts/:id",
            get(get_account).patch(update_account).delete(delete_account),
        )
        .route("/accounts/:id/pay", patch(pay_account))
}

async fn audit(state: &AppState, user: &AuthUser, action: AuditAction, entity: &str, id: i32, details: Value) {
    state.audit(user, Module::Finance, action, entity, Some(id), details).await;
}

fn check_amount(amount: Option<f64>) -> ApiResult<()> {
    match amount {
        Some(amount) if !amount.is_finite() || amount < 0.0 => {
            Err(ApiError::bad_request("amount must not be negative"))
        }
        _ => Ok(()),
    }
}

// Expenses

#[derive(Debug, Default, Deserialize)]
pub struct ExpenseQuery {
    pub category: Option<String>,
    pub paid: Option<bool>,
}

pub async fn list_expenses(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ExpenseQuery>,
) -> ApiResult<Json<Vec<Expense>>> {
    user.require(Module::Finance)?;
    let mut expenses: Vec<Expense> = state
        .store
        .all::<Expense>()
        .await?
        .into_iter()
        .filter(|e| query.category.as_ref().map_or(true, |c| &e.data.category == c))
        .filter(|e| query.paid.map_or(true, |paid| e.data.payment_date.is_some() == paid))
        .collect();
    expenses.sort_by(|a, b| a.data.due_date.cmp(&b.data.due_date).then(a.id.cmp(&b.id)));
    Ok(Json(expenses))
}

pub async fn get_expense(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<Json<Expense>> {
    user.require(Module::Finance)?;
    Ok(Json(state.store.get::<Expense>(id).await?))
}

pub async fn create_expense(
    State(state): State<AppState>,
    user: AuthUser,
    Json(mut expense): Json<ExpenseData>,
) -> ApiResult<(StatusCode, Json<Expense>)> {
    user.require(Module::Finance)?;
    require_text(&expense.description, "description", 1)?;
    require_text(&expense.category, "category", 1)?;
    check_amount(Some(expense.amount))?;
    expense.created_by = Some(user.id);
    let stored = state.store.create::<Expense>(expense).await?;
    audit(&state, &user, AuditAction::Create, "expense", stored.id, to_details(&stored)).await;
    Ok(created(stored))
}

pub async fn update_expense(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(changes): Json<ExpenseChanges>,
) -> ApiResult<Json<Expense>> {
    user.require(Module::Finance)?;
    if let Some(description) = &changes.description {
        require_text(description, "description", 1)?;
    }
    if let Some(category) = &changes.category {
        require_text(category, "category", 1)?;
    }
    check_amount(changes.amount)?;
    let updated = state.store.update::<Expense>(id, changes.clone()).await?;
    audit(&state, &user, AuditAction::Update, "expense", id, to_details(&changes)).await;
    Ok(Json(updated))
}

pub async fn delete_expense(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<StatusCode> {
    user.require(Module::Finance)?;
    state.store.delete::<Expense>(id).await?;
    audit(&state, &user, AuditAction::Delete, "expense", id, Value::Null).await;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayBody {
    pub payment_date: Option<NaiveDate>,
}

/// Stamps the payment date, today unless given.
pub async fn pay_expense(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    body: Option<Json<PayBody>>,
) -> ApiResult<Json<Expense>> {
    user.require(Module::Finance)?;
    let current = state.store.get::<Expense>(id).await?;
    if current.data.payment_date.is_some() {
        return Err(ApiError::bad_request("expense is already paid"));
    }
    let paid_on = body
        .and_then(|Json(body)| body.payment_date)
        .unwrap_or_else(|| Utc::now().date_naive());
    let changes = ExpenseChanges { payment_date: Some(paid_on), ..Default::default() };
    let updated = state.store.update::<Expense>(id, changes).await?;
    audit(&state, &user, AuditAction::Update, "expense", id, json!({ "paymentDate": paid_on })).await;
    Ok(Json(updated))
}

// Accounts payable and receivable

fn check_account_kinds(kind: Option<&str>, status: Option<&str>) -> ApiResult<()> {
    if let Some(kind) = kind {
        kind.parse::<AccountType>()?;
    }
    if let Some(status) = status {
        status.parse::<AccountStatus>()?;
    }
    Ok(())
}

#[derive(Debug, Default, Deserialize)]
pub struct AccountQuery {
    #[serde(rename = "type")]
    pub type_: Option<String>,
    pub status: Option<String>,
}

pub async fn list_accounts(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<AccountQuery>,
) -> ApiResult<Json<Vec<Account>>> {
    user.require(Module::Finance)?;
    check_account_kinds(query.type_.as_deref(), query.status.as_deref())?;
    let mut accounts: Vec<Account> = state
        .store
        .all::<Account>()
        .await?
        .into_iter()
        .filter(|a| query.type_.as_ref().map_or(true, |t| &a.data.type_ == t))
        .filter(|a| query.status.as_ref().map_or(true, |s| &a.data.status == s))
        .collect();
    accounts.sort_by(|a, b| a.data.due_date.cmp(&b.data.due_date).then(a.id.cmp(&b.id)));
    Ok(Json(accounts))
}

pub async fn get_account(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<Json<Account>> {
    user.require(Module::Finance)?;
    Ok(Json(state.store.get::<Account>(id).await?))
}

pub async fn create_account(
    State(state): State<AppState>,
    user: AuthUser,
    Json(mut account): Json<AccountData>,
) -> ApiResult<(StatusCode, Json<Account>)> {
    user.require(Module::Finance)?;
    require_text(&account.description, "description", 1)?;
    require_text(&account.entity_name, "entityName", 1)?;
    check_account_kinds(Some(&account.type_), Some(&account.status))?;
    check_amount(Some(account.amount))?;
    account.created_by = Some(user.id);
    let stored = state.store.create::<Account>(account).await?;
    audit(&state, &user, AuditAction::Create, "account", stored.id, to_details(&stored)).await;
    Ok(created(stored))
}

pub async fn update_account(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(changes): Json<AccountChanges>,
) -> ApiResult<Json<Account>> {
    user.require(Module::Finance)?;
    check_account_kinds(changes.type_.as_deref(), changes.status.as_deref())?;
    check_amount(changes.amount)?;
    if let Some(name) = &changes.entity_name {
        require_text(name, "entityName", 1)?;
    }
    let updated = state.store.update::<Account>(id, changes.clone()).await?;
    audit(&state, &user, AuditAction::Update, "account", id, to_details(&changes)).await;
    Ok(Json(updated))
}

pub async fn delete_account(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<StatusCode> {
    user.require(Module::Finance)?;
    state.store.delete::<Account>(id).await?;
    audit(&state, &user, AuditAction::Delete, "account", id, Value::Null).await;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn pay_account(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<Json<Account>> {
    user.require(Module::Finance)?;
    let current = state.store.get::<Account>(id).await?;
    let status = current.data.status.parse::<AccountStatus>()?.pay()?;
    let changes = AccountChanges { status: Some(status.to_string()), ..Default::default() };
    let updated = state.store.update::<Account>(id, changes).await?;
    audit(
        &state,
        &user,
        AuditAction::Update,
        "account",
        id,
        json!({ "status": status, "from": current.data.status }),
    )
    .await;
    Ok(Json(updated))
}
