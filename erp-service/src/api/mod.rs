//! HTTP surface: one router per module, merged under `/api`.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use serde_json::Value;
use shared::status::AuditAction;
use shared::Module;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::auth::AuthUser;
use crate::chat_hub::ChatHub;
use crate::config::AppConfig;
use crate::error::{ApiError, ApiResult};
use crate::models::{SystemAuditLog, SystemAuditLogData};
use crate::sefaz::SefazGateway;
use crate::store::Storage;

pub mod admin;
pub mod chat;
pub mod dashboard;
pub mod finance;
pub mod fiscal;
pub mod hr;
pub mod inventory;
pub mod maintenance;
pub mod orders;
pub mod pricing;
pub mod production;
pub mod purchase;
pub mod quality;
pub mod support;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Storage>,
    pub config: Arc<AppConfig>,
    pub hub: Arc<ChatHub>,
    pub sefaz: Arc<dyn SefazGateway>,
}

impl AppState {
    pub fn new(store: Arc<dyn Storage>, config: AppConfig, sefaz: Arc<dyn SefazGateway>) -> Self {
        AppState {
            store,
            config: Arc::new(config),
            hub: Arc::new(ChatHub::new()),
            sefaz,
        }
    }

    /// Records a write in the system audit log. A failure here is logged and
    /// never fails the request that made the write.
    pub async fn audit(
        &self,
        user: &AuthUser,
        module: Module,
        action: AuditAction,
        entity_type: &str,
        entity_id: Option<i32>,
        details: Value,
    ) {
        let entry = SystemAuditLogData {
            user_id: Some(user.id),
            action: action.to_string(),
            entity_type: entity_type.to_string(),
            entity_id,
            details: (!details.is_null()).then_some(details),
            ip_address: user.ip.clone(),
            user_agent: user.user_agent.clone(),
            module: Some(module.to_string()),
        };
        if let Err(e) = self.store.create::<SystemAuditLog>(entry).await {
            warn!("Failed to record audit log for {} {:?}: {}", entity_type, entity_id, e);
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .merge(dashboard::routes())
        .merge(admin::routes())
        .merge(finance::routes())
        .merge(production::routes())
        .merge(maintenance::routes())
        .merge(inventory::routes())
        .merge(orders::routes())
        .merge(hr::routes())
        .merge(fiscal::routes())
        .merge(purchase::routes())
        .merge(pricing::routes())
        .merge(quality::routes())
        .merge(chat::routes())
        .merge(support::routes());

    let body_limit = state.config.max_upload_bytes + 1024 * 1024;
    let uploads = ServeDir::new(&state.config.uploads_dir);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api)
        .nest_service("/uploads", uploads)
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

pub async fn health_check() -> &'static str {
    "OK"
}

/// `201 Created` with the stored row.
pub fn created<T: Serialize>(value: T) -> (StatusCode, Json<T>) {
    (StatusCode::CREATED, Json(value))
}

pub fn to_details<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

pub fn require_text(value: &str, field: &str, min_chars: usize) -> ApiResult<()> {
    if value.trim().chars().count() < min_chars {
        return Err(if min_chars <= 1 {
            ApiError::bad_request(format!("{field} is required"))
        } else {
            ApiError::bad_request(format!("{field} must have at least {min_chars} characters"))
        });
    }
    Ok(())
}

/// Accepts `2024-05-01` or a full RFC 3339 timestamp. A bare date used as an
/// upper bound covers the whole day.
pub fn parse_instant(value: &str, end_of_day: bool) -> ApiResult<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return Ok(at.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ApiError::bad_request(format!("invalid date '{value}'")))?;
    let time = if end_of_day {
        NaiveTime::from_hms_milli_opt(23, 59, 59, 999)
    } else {
        NaiveTime::from_hms_opt(0, 0, 0)
    }
    .unwrap_or(NaiveTime::MIN);
    Ok(date.and_time(time).and_utc())
}
