use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, patch, post},
    Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shared::permissions::{normalize_permissions, uniform_permissions};
use shared::status::{AlertPriority, AlertStatus, AuditAction};
use shared::{Module, Page};

use super::{created, parse_instant, require_text, to_details, AppState};
use crate::auth::{hash_password, issue_token, verify_password, AuthUser};
use crate::error::{ApiError, ApiResult};
use crate::models::*;
use crate::store::{AuditEntry, AuditFilter};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/user", get(current_user))
        .route("/users", get(list_users))
        .route("/users/:id", patch(update_user).delete(delete_user))
        .route("/users/:id/password", patch(change_password))
        .route("/users/:id/permissions", patch(update_permissions))
        .route("/system-audit-logs", get(audit_logs))
        .route("/alerts", get(list_alerts).post(create_alert))
        .route("/alerts/active", get(active_alerts))
        .route("/alerts/:id", axum::routing::delete(delete_alert))
        .route("/alerts/:id/acknowledge", patch(acknowledge_alert))
        .route("/alerts/:id/resolve", patch(resolve_alert))
        .route("/company", get(get_company).post(create_company))
        .route("/company/:id", patch(update_company))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub full_name: String,
    pub email: String,
    pub role: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

/// Open registration creates plain users; only an admin caller may pick
/// another role.
pub async fn register(
    State(state): State<AppState>,
    caller: Option<AuthUser>,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    require_text(&request.username, "username", 1)?;
    require_text(&request.password, "password", 1)?;

    if state.store.user_by_username(request.username.clone()).await?.is_some() {
        return Err(ApiError::bad_request("user already exists"));
    }

    let role = match (&caller, request.role) {
        (Some(admin), Some(role)) if admin.is_admin() && !role.trim().is_empty() => role,
        _ => "user".to_string(),
    };
    let user = state
        .store
        .create::<User>(UserData {
            username: request.username.trim().to_string(),
            password: hash_password(&request.password, state.config.password_iterations),
            full_name: request.full_name,
            email: request.email,
            role,
            active: true,
            status: None,
            status_message: None,
            permissions: uniform_permissions(false),
        })
        .await?;

    tracing::info!("Registered user {} ({})", user.data.username, user.id);
    let token = issue_token(&user, &state.config)?;
    Ok(created(AuthResponse { token, user }))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let invalid = || ApiError::Unauthorized("invalid credentials".into());
    let user = state
        .store
        .user_by_username(request.username)
        .await?
        .ok_or_else(invalid)?;
    if !verify_password(&request.password, &user.data.password) {
        return Err(invalid());
    }
    if !user.data.active {
        return Err(ApiError::Unauthorized("user is inactive".into()));
    }
    let token = issue_token(&user, &state.config)?;
    Ok(Json(AuthResponse { token, user }))
}

/// Tokens are stateless; the client drops its copy.
pub async fn logout() -> StatusCode {
    StatusCode::OK
}

pub async fn current_user(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<User>> {
    Ok(Json(state.store.get::<User>(user.id).await?))
}

fn require_admin(user: &AuthUser) -> ApiResult<()> {
    user.require(Module::Admin)
}

pub async fn list_users(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<Vec<User>>> {
    require_admin(&user)?;
    Ok(Json(state.store.all::<User>().await?))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub active: Option<bool>,
    pub status: Option<String>,
    pub status_message: Option<String>,
}

pub async fn update_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(update): Json<UserUpdate>,
) -> ApiResult<Json<User>> {
    require_admin(&user)?;
    if let Some(role) = &update.role {
        require_text(role, "role", 1)?;
    }
    let changes = UserChanges {
        full_name: update.full_name,
        email: update.email,
        role: update.role,
        active: update.active,
        status: update.status,
        status_message: update.status_message,
        ..Default::default()
    };
    let updated = state.store.update::<User>(id, changes.clone()).await?;
    state
        .audit(&user, Module::Admin, AuditAction::Update, "user", Some(id), to_details(&changes))
        .await;
    Ok(Json(updated))
}

pub async fn delete_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<StatusCode> {
    require_admin(&user)?;
    if id == user.id {
        return Err(ApiError::bad_request("you cannot delete your own account"));
    }
    let doomed = state.store.get::<User>(id).await?;
    state.store.delete::<User>(id).await?;
    state
        .audit(
            &user,
            Module::Admin,
            AuditAction::Delete,
            "user",
            Some(id),
            json!({ "username": doomed.data.username }),
        )
        .await;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct PasswordChange {
    #[serde(default)]
    pub password: String,
}

pub async fn change_password(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(body): Json<PasswordChange>,
) -> ApiResult<Json<Value>> {
    require_admin(&user)?;
    require_text(&body.password, "password", 1)?;
    let changes = UserChanges {
        password: Some(hash_password(&body.password, state.config.password_iterations)),
        ..Default::default()
    };
    state.store.update::<User>(id, changes).await?;
    state
        .audit(
            &user,
            Module::Admin,
            AuditAction::Update,
            "user",
            Some(id),
            json!({ "field": "password" }),
        )
        .await;
    Ok(Json(json!({ "message": "password updated" })))
}

#[derive(Debug, Deserialize)]
pub struct PermissionsBody {
    pub permissions: Option<Value>,
}

/// The path segment is a numeric id or a username.
pub async fn update_permissions(
    State(state): State<AppState>,
    user: AuthUser,
    Path(target): Path<String>,
    Json(body): Json<PermissionsBody>,
) -> ApiResult<Json<User>> {
    require_admin(&user)?;
    let submitted = body
        .permissions
        .ok_or_else(|| ApiError::bad_request("permissions are required"))?;
    let permissions = normalize_permissions(&submitted)?;

    let target_user = match target.parse::<i32>() {
        Ok(id) => state.store.get::<User>(id).await?,
        Err(_) => state
            .store
            .user_by_username(target)
            .await?
            .ok_or_else(|| ApiError::not_found("user"))?,
    };

    let changes = UserChanges { permissions: Some(permissions.clone()), ..Default::default() };
    let updated = state.store.update::<User>(target_user.id, changes).await?;
    state
        .audit(
            &user,
            Module::Admin,
            AuditAction::Update,
            "user_permissions",
            Some(updated.id),
            json!({ "permissions": permissions }),
        )
        .await;
    Ok(Json(updated))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditQuery {
    pub module: Option<String>,
    pub entity_type: Option<String>,
    pub action: Option<String>,
    pub user_id: Option<i32>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub search: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total_count: i64,
    pub total_pages: i64,
}

impl Pagination {
    pub fn new(page: Page, total_count: i64) -> Self {
        Pagination {
            page: page.page,
            limit: page.size,
            total_count,
            total_pages: page.total_pages(total_count),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuditPage<T> {
    pub logs: Vec<T>,
    pub pagination: Pagination,
}

pub const AUDIT_PAGE_SIZE: i64 = 50;
pub const SYSTEM_USER: &str = "Sistema";

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub fn sort_ascending(order: Option<&str>) -> ApiResult<bool> {
    match order {
        None | Some("desc") => Ok(false),
        Some("asc") => Ok(true),
        Some(other) => Err(ApiError::bad_request(format!("invalid sortOrder '{other}'"))),
    }
}

pub async fn audit_logs(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<AuditQuery>,
) -> ApiResult<Json<AuditPage<AuditEntry>>> {
    require_admin(&user)?;
    let page = Page::new(query.page, query.limit, AUDIT_PAGE_SIZE);
    let filter = AuditFilter {
        module: non_empty(query.module),
        entity_type: non_empty(query.entity_type),
        action: non_empty(query.action),
        user_id: query.user_id,
        from: non_empty(query.start_date).map(|d| parse_instant(&d, false)).transpose()?,
        until: non_empty(query.end_date).map(|d| parse_instant(&d, true)).transpose()?,
        search: non_empty(query.search),
        ascending: sort_ascending(query.sort_order.as_deref())?,
        page,
    };
    let (entries, total) = state.store.search_audit_logs(filter).await?;
    let logs = entries
        .into_iter()
        .map(|mut entry| {
            entry.username.get_or_insert_with(|| SYSTEM_USER.to_string());
            entry
        })
        .collect();
    Ok(Json(AuditPage { logs, pagination: Pagination::new(page, total) }))
}

pub async fn list_alerts(
    State(state): State<AppState>,
    _user: AuthUser,
) -> ApiResult<Json<Vec<SystemAlert>>> {
    let mut alerts = state.store.all::<SystemAlert>().await?;
    alerts.reverse();
    Ok(Json(alerts))
}

/// Unresolved alerts, most urgent first, newest first within a priority.
pub async fn active_alerts(
    State(state): State<AppState>,
    _user: AuthUser,
) -> ApiResult<Json<Vec<SystemAlert>>> {
    let resolved = AlertStatus::Resolved.as_str();
    let mut alerts: Vec<SystemAlert> = state
        .store
        .all::<SystemAlert>()
        .await?
        .into_iter()
        .filter(|a| a.data.status != resolved)
        .collect();
    let rank = |a: &SystemAlert| {
        a.data.priority.parse::<AlertPriority>().map(AlertPriority::rank).unwrap_or(u8::MAX)
    };
    alerts.sort_by(|a, b| {
        rank(a)
            .cmp(&rank(b))
            .then_with(|| b.created_at.cmp(&a.created_at))
            .then_with(|| b.id.cmp(&a.id))
    });
    Ok(Json(alerts))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAlert {
    pub message: String,
    pub priority: Option<AlertPriority>,
    pub module: String,
    pub reference_type: Option<String>,
    pub reference_id: Option<i32>,
}

pub async fn create_alert(
    State(state): State<AppState>,
    user: AuthUser,
    Json(alert): Json<NewAlert>,
) -> ApiResult<(StatusCode, Json<SystemAlert>)> {
    require_text(&alert.message, "message", 1)?;
    let module: Module = alert.module.parse()?;
    let created_alert = state
        .store
        .create::<SystemAlert>(SystemAlertData {
            message: alert.message,
            priority: alert.priority.unwrap_or(AlertPriority::Medium).to_string(),
            status: AlertStatus::Active.to_string(),
            module: module.to_string(),
            reference_type: alert.reference_type,
            reference_id: alert.reference_id,
            created_by: Some(user.id),
            acknowledged_at: None,
            acknowledged_by: None,
            resolved_at: None,
            resolved_by: None,
        })
        .await?;
    state
        .audit(
            &user,
            module,
            AuditAction::Create,
            "alert",
            Some(created_alert.id),
            to_details(&created_alert),
        )
        .await;
    Ok(created(created_alert))
}

async fn move_alert(
    state: &AppState,
    user: &AuthUser,
    id: i32,
    acknowledge: bool,
) -> ApiResult<SystemAlert> {
    let alert = state.store.get::<SystemAlert>(id).await?;
    let current: AlertStatus = alert.data.status.parse()?;
    let now = Utc::now();
    let changes = if acknowledge {
        SystemAlertChanges {
            status: Some(current.acknowledge()?.to_string()),
            acknowledged_at: Some(now),
            acknowledged_by: Some(user.id),
            ..Default::default()
        }
    } else {
        SystemAlertChanges {
            status: Some(current.resolve()?.to_string()),
            resolved_at: Some(now),
            resolved_by: Some(user.id),
            ..Default::default()
        }
    };
    let updated = state.store.update::<SystemAlert>(id, changes).await?;
    let module = updated.data.module.parse().unwrap_or(Module::Admin);
    state
        .audit(
            user,
            module,
            AuditAction::Update,
            "alert",
            Some(id),
            json!({ "status": updated.data.status }),
        )
        .await;
    Ok(updated)
}

pub async fn acknowledge_alert(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<Json<SystemAlert>> {
    Ok(Json(move_alert(&state, &user, id, true).await?))
}

pub async fn resolve_alert(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<Json<SystemAlert>> {
    Ok(Json(move_alert(&state, &user, id, false).await?))
}

pub async fn delete_alert(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<StatusCode> {
    require_admin(&user)?;
    state.store.delete::<SystemAlert>(id).await?;
    state
        .audit(&user, Module::Admin, AuditAction::Delete, "alert", Some(id), Value::Null)
        .await;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_company(State(state): State<AppState>, _user: AuthUser) -> ApiResult<Json<Company>> {
    state
        .store
        .all::<Company>()
        .await?
        .into_iter()
        .next()
        .map(Json)
        .ok_or_else(|| ApiError::not_found("company"))
}

fn check_company_tax_id(tax_id: Option<&str>) -> ApiResult<Option<String>> {
    match tax_id.filter(|t| !t.trim().is_empty()) {
        Some(t) => Ok(Some(shared::documents::validate_tax_id(t)?)),
        None => Ok(None),
    }
}

pub async fn create_company(
    State(state): State<AppState>,
    user: AuthUser,
    Json(mut company): Json<CompanyData>,
) -> ApiResult<(StatusCode, Json<Company>)> {
    require_admin(&user)?;
    require_text(&company.name, "name", 1)?;
    if !state.store.all::<Company>().await?.is_empty() {
        return Err(ApiError::Conflict("company profile already exists".into()));
    }
    company.tax_id = check_company_tax_id(company.tax_id.as_deref())?;
    let stored = state.store.create::<Company>(company).await?;
    state
        .audit(&user, Module::Admin, AuditAction::Create, "company", Some(stored.id), to_details(&stored))
        .await;
    Ok(created(stored))
}

pub async fn update_company(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(mut changes): Json<CompanyChanges>,
) -> ApiResult<Json<Company>> {
    require_admin(&user)?;
    if changes.tax_id.is_some() {
        changes.tax_id = check_company_tax_id(changes.tax_id.as_deref())?;
    }
    let updated = state.store.update::<Company>(id, changes.clone()).await?;
    state
        .audit(&user, Module::Admin, AuditAction::Update, "company", Some(id), to_details(&changes))
        .await;
    Ok(Json(updated))
}
