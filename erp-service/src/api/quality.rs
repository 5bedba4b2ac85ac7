use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, patch},
    Router,
};
use chrono::{Datelike, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use shared::codes::next_code;
use shared::status::{
    AlertPriority, AlertStatus, AuditAction, InspectionReference, InspectionResult, InspectionType,
    NonConformityStatus, Severity,
};
use shared::Module;

use super::{created, require_text, to_details, AppState};
use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::models::*;

pub const NON_CONFORMITY_ALERT: &str = "non_conformity";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/quality/inspections", get(list_inspections).post(create_inspection))
        .route(
            "/quality/inspections/:id",
            get(get_inspection).patch(update_inspection).delete(delete_inspection),
        )
        .route("/quality/issues", get(list_issues).post(create_issue))
        .route(
            "/quality/issues/:id",
            get(get_issue).patch(update_issue).delete(delete_issue),
        )
        .route("/quality/issues/:id/status", patch(change_status))
        .route("/quality/non-conformities", get(list_issues).post(create_issue))
        .route(
            "/quality/non-conformities/:id",
            get(get_issue).patch(update_issue).delete(delete_issue),
        )
        .route("/quality/non-conformities/:id/status", patch(change_status))
}

async fn audit(state: &AppState, user: &AuthUser, action: AuditAction, entity: &str, id: i32, details: Value) {
    state.audit(user, Module::Quality, action, entity, Some(id), details).await;
}

// Inspections

fn check_inspection_kinds(kind: Option<&str>, reference: Option<&str>, result: Option<&str>) -> ApiResult<()> {
    if let Some(kind) = kind {
        kind.parse::<InspectionType>()?;
    }
    if let Some(reference) = reference {
        reference.parse::<InspectionReference>()?;
    }
    if let Some(result) = result {
        result.parse::<InspectionResult>()?;
    }
    Ok(())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionQuery {
    pub result: Option<String>,
    pub reference_type: Option<String>,
}

pub async fn list_inspections(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<InspectionQuery>,
) -> ApiResult<Json<Vec<QualityInspection>>> {
    user.require(Module::Quality)?;
    let mut inspections: Vec<QualityInspection> = state
        .store
        .all::<QualityInspection>()
        .await?
        .into_iter()
        .filter(|i| query.result.as_ref().map_or(true, |r| &i.data.result == r))
        .filter(|i| {
            query
                .reference_type
                .as_ref()
                .map_or(true, |r| &i.data.reference_type == r)
        })
        .collect();
    inspections.sort_by(|a, b| {
        b.data
            .inspection_date
            .cmp(&a.data.inspection_date)
            .then(b.id.cmp(&a.id))
    });
    Ok(Json(inspections))
}

pub async fn get_inspection(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<Json<QualityInspection>> {
    user.require(Module::Quality)?;
    Ok(Json(state.store.get::<QualityInspection>(id).await?))
}

pub async fn create_inspection(
    State(state): State<AppState>,
    user: AuthUser,
    Json(mut inspection): Json<QualityInspectionData>,
) -> ApiResult<(StatusCode, Json<QualityInspection>)> {
    user.require(Module::Quality)?;
    check_inspection_kinds(
        Some(&inspection.inspection_type),
        Some(&inspection.reference_type),
        Some(&inspection.result),
    )?;
    inspection.created_by = Some(user.id);
    let stored = state.store.create::<QualityInspection>(inspection).await?;
    audit(&state, &user, AuditAction::Create, "quality_inspection", stored.id, to_details(&stored)).await;
    Ok(created(stored))
}

pub async fn update_inspection(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(changes): Json<QualityInspectionChanges>,
) -> ApiResult<Json<QualityInspection>> {
    user.require(Module::Quality)?;
    check_inspection_kinds(
        changes.inspection_type.as_deref(),
        changes.reference_type.as_deref(),
        changes.result.as_deref(),
    )?;
    let updated = state.store.update::<QualityInspection>(id, changes.clone()).await?;
    audit(&state, &user, AuditAction::Update, "quality_inspection", id, to_details(&changes)).await;
    Ok(Json(updated))
}

pub async fn delete_inspection(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<StatusCode> {
    user.require(Module::Quality)?;
    state.store.delete::<QualityInspection>(id).await?;
    audit(&state, &user, AuditAction::Delete, "quality_inspection", id, Value::Null).await;
    Ok(StatusCode::NO_CONTENT)
}

// Non-conformities

fn check_issue_text(title: Option<&str>, description: Option<&str>) -> ApiResult<()> {
    if let Some(title) = title {
        require_text(title, "title", 3)?;
    }
    if let Some(description) = description {
        require_text(description, "description", 5)?;
    }
    Ok(())
}

#[derive(Debug, Default, Deserialize)]
pub struct IssueQuery {
    pub status: Option<String>,
    pub severity: Option<String>,
}

pub async fn list_issues(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<IssueQuery>,
) -> ApiResult<Json<Vec<NonConformity>>> {
    user.require(Module::Quality)?;
    let mut issues: Vec<NonConformity> = state
        .store
        .all::<NonConformity>()
        .await?
        .into_iter()
        .filter(|nc| query.status.as_ref().map_or(true, |s| &nc.data.status == s))
        .filter(|nc| query.severity.as_ref().map_or(true, |s| &nc.data.severity == s))
        .collect();
    issues.sort_by(|a, b| {
        b.data
            .detected_date
            .cmp(&a.data.detected_date)
            .then(b.id.cmp(&a.id))
    });
    Ok(Json(issues))
}

pub async fn get_issue(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<Json<NonConformity>> {
    user.require(Module::Quality)?;
    Ok(Json(state.store.get::<NonConformity>(id).await?))
}

/// Codes run per detection year. A critical issue also raises an alert.
pub async fn create_issue(
    State(state): State<AppState>,
    user: AuthUser,
    Json(mut issue): Json<NonConformityData>,
) -> ApiResult<(StatusCode, Json<NonConformity>)> {
    user.require(Module::Quality)?;
    check_issue_text(Some(&issue.title), Some(&issue.description))?;
    let severity: Severity = issue.severity.parse()?;
    require_text(&issue.origin, "origin", 1)?;

    let existing = state.store.all::<NonConformity>().await?;
    issue.code = next_code(
        "NC",
        issue.detected_date.year(),
        3,
        existing.iter().map(|nc| nc.data.code.as_str()),
    );
    issue.status = NonConformityStatus::Open.to_string();
    issue.resolved_date = None;
    issue.created_by = Some(user.id);
    let stored = state.store.create::<NonConformity>(issue).await?;

    if severity == Severity::Critical {
        let alert = SystemAlertData {
            message: format!("Não conformidade crítica {}: {}", stored.data.code, stored.data.title),
            priority: AlertPriority::High.to_string(),
            status: AlertStatus::Active.to_string(),
            module: Module::Quality.to_string(),
            reference_type: Some(NON_CONFORMITY_ALERT.to_string()),
            reference_id: Some(stored.id),
            created_by: Some(user.id),
            acknowledged_at: None,
            acknowledged_by: None,
            resolved_at: None,
            resolved_by: None,
        };
        if let Err(e) = state.store.create::<SystemAlert>(alert).await {
            tracing::warn!("Failed to raise alert for {}: {}", stored.data.code, e);
        }
    }

    audit(&state, &user, AuditAction::Create, "non_conformity", stored.id, to_details(&stored)).await;
    Ok(created(stored))
}

/// Status moves only through the status route.
pub async fn update_issue(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(mut changes): Json<NonConformityChanges>,
) -> ApiResult<Json<NonConformity>> {
    user.require(Module::Quality)?;
    changes.status = None;
    changes.resolved_date = None;
    check_issue_text(changes.title.as_deref(), changes.description.as_deref())?;
    if let Some(severity) = &changes.severity {
        severity.parse::<Severity>()?;
    }
    let updated = state.store.update::<NonConformity>(id, changes.clone()).await?;
    audit(&state, &user, AuditAction::Update, "non_conformity", id, to_details(&changes)).await;
    Ok(Json(updated))
}

pub async fn delete_issue(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<StatusCode> {
    user.require(Module::Quality)?;
    state.store.delete::<NonConformity>(id).await?;
    audit(&state, &user, AuditAction::Delete, "non_conformity", id, Value::Null).await;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub status: String,
}

/// Resolving stamps today's date; any other status clears it.
pub async fn change_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(body): Json<StatusBody>,
) -> ApiResult<Json<NonConformity>> {
    user.require(Module::Quality)?;
    let requested: NonConformityStatus = body.status.parse()?;
    let current = state.store.get::<NonConformity>(id).await?;
    let from: NonConformityStatus = current.data.status.parse()?;
    let status = from.move_to(requested)?;
    let resolved_date = match status {
        NonConformityStatus::Resolved => Some(
            current
                .data
                .resolved_date
                .unwrap_or_else(|| Utc::now().date_naive()),
        ),
        _ => None,
    };
    let changes = NonConformityChanges {
        status: Some(status.to_string()),
        resolved_date: Some(resolved_date),
        ..Default::default()
    };
    let updated = state.store.update::<NonConformity>(id, changes).await?;
    audit(
        &state,
        &user,
        AuditAction::Update,
        "non_conformity",
        id,
        json!({ "status": status, "from": current.data.status }),
    )
    .await;
    Ok(Json(updated))
}
