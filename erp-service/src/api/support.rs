use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use shared::status::{AuditAction, TicketPriority, TicketStatus};
use shared::Module;

use super::{created, require_text, to_details, AppState};
use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::models::*;
use crate::store::Record;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/support/tickets", get(list_tickets).post(create_ticket))
        .route(
            "/support/tickets/:id",
            get(get_ticket).patch(update_ticket).delete(delete_ticket),
        )
        .route("/support/knowledge", get(list_articles).post(create_article))
        .route(
            "/support/knowledge/:id",
            get(get_article).patch(update_article).delete(delete_article),
        )
}

async fn audit(state: &AppState, user: &AuthUser, action: AuditAction, entity: &str, id: i32, details: Value) {
    state.audit(user, Module::Support, action, entity, Some(id), details).await;
}

// Tickets

/// Anyone may open tickets; only admins see other people's.
async fn visible_ticket(state: &AppState, user: &AuthUser, id: i32) -> ApiResult<SupportTicket> {
    let ticket = state.store.get::<SupportTicket>(id).await?;
    if !user.is_admin() && ticket.data.user_id != user.id {
        return Err(ApiError::not_found(SupportTicket::ENTITY));
    }
    Ok(ticket)
}

#[derive(Debug, Default, Deserialize)]
pub struct TicketQuery {
    pub status: Option<String>,
    pub priority: Option<String>,
}

pub async fn list_tickets(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<TicketQuery>,
) -> ApiResult<Json<Vec<SupportTicket>>> {
    let mut tickets: Vec<SupportTicket> = state
        .store
        .all::<SupportTicket>()
        .await?
        .into_iter()
        .filter(|t| user.is_admin() || t.data.user_id == user.id)
        .filter(|t| query.status.as_ref().map_or(true, |s| &t.data.status == s))
        .filter(|t| query.priority.as_ref().map_or(true, |p| &t.data.priority == p))
        .collect();
    tickets.reverse();
    Ok(Json(tickets))
}

pub async fn get_ticket(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<Json<SupportTicket>> {
    Ok(Json(visible_ticket(&state, &user, id).await?))
}

pub async fn create_ticket(
    State(state): State<AppState>,
    user: AuthUser,
    Json(mut ticket): Json<SupportTicketData>,
) -> ApiResult<(StatusCode, Json<SupportTicket>)> {
    require_text(&ticket.title, "title", 1)?;
    require_text(&ticket.description, "description", 1)?;
    require_text(&ticket.category, "category", 1)?;
    ticket.priority.parse::<TicketPriority>()?;
    let status: TicketStatus = ticket.status.parse()?;
    ticket.closed_at = status.is_closed().then(Utc::now);
    ticket.user_id = user.id;
    if let Some(assignee) = ticket.assigned_to {
        state.store.get::<User>(assignee).await?;
    }
    let stored = state.store.create::<SupportTicket>(ticket).await?;
    audit(&state, &user, AuditAction::Create, "support_ticket", stored.id, to_details(&stored)).await;
    Ok(created(stored))
}

/// Closing stamps `closedAt`; reopening clears it.
pub async fn update_ticket(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(mut changes): Json<SupportTicketChanges>,
) -> ApiResult<Json<SupportTicket>> {
    let current = visible_ticket(&state, &user, id).await?;
    if let Some(priority) = &changes.priority {
        priority.parse::<TicketPriority>()?;
    }
    if let Some(assignee) = changes.assigned_to {
        state.store.get::<User>(assignee).await?;
    }
    changes.closed_at = None;
    if let Some(status) = &changes.status {
        let next: TicketStatus = status.parse()?;
        let was_closed = current
            .data
            .status
            .parse::<TicketStatus>()
            .is_ok_and(TicketStatus::is_closed);
        if next.is_closed() && !was_closed {
            changes.closed_at = Some(Some(Utc::now()));
        } else if !next.is_closed() && was_closed {
            changes.closed_at = Some(None);
        }
    }
    let updated = state.store.update::<SupportTicket>(id, changes.clone()).await?;
    audit(&state, &user, AuditAction::Update, "support_ticket", id, to_details(&changes)).await;
    Ok(Json(updated))
}

pub async fn delete_ticket(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<StatusCode> {
    visible_ticket(&state, &user, id).await?;
    state.store.delete::<SupportTicket>(id).await?;
    audit(&state, &user, AuditAction::Delete, "support_ticket", id, Value::Null).await;
    Ok(StatusCode::NO_CONTENT)
}

// Knowledge base

#[derive(Debug, Default, Deserialize)]
pub struct ArticleQuery {
    pub category: Option<String>,
    pub search: Option<String>,
}

pub async fn list_articles(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ArticleQuery>,
) -> ApiResult<Json<Vec<KnowledgeArticle>>> {
    let search = query.search.map(|s| s.to_lowercase()).filter(|s| !s.is_empty());
    let articles = state
        .store
        .all::<KnowledgeArticle>()
        .await?
        .into_iter()
        .filter(|a| user.is_admin() || a.data.published)
        .filter(|a| query.category.as_ref().map_or(true, |c| &a.data.category == c))
        .filter(|a| {
            search.as_ref().map_or(true, |s| {
                a.data.title.to_lowercase().contains(s)
                    || a.data.content.to_lowercase().contains(s)
                    || a.data.tags.as_deref().is_some_and(|t| t.to_lowercase().contains(s))
            })
        })
        .collect();
    Ok(Json(articles))
}

/// Counts a view on every read.
pub async fn get_article(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<Json<KnowledgeArticle>> {
    let article = state.store.get::<KnowledgeArticle>(id).await?;
    if !article.data.published && !user.is_admin() {
        return Err(ApiError::not_found(KnowledgeArticle::ENTITY));
    }
    let changes = KnowledgeArticleChanges {
        views: Some(article.data.views.saturating_add(1)),
        ..Default::default()
    };
    Ok(Json(state.store.update::<KnowledgeArticle>(id, changes).await?))
}

pub async fn create_article(
    State(state): State<AppState>,
    user: AuthUser,
    Json(mut article): Json<KnowledgeArticleData>,
) -> ApiResult<(StatusCode, Json<KnowledgeArticle>)> {
    user.require(Module::Support)?;
    require_text(&article.title, "title", 1)?;
    require_text(&article.content, "content", 1)?;
    require_text(&article.category, "category", 1)?;
    article.views = 0;
    article.created_by = Some(user.id);
    let stored = state.store.create::<KnowledgeArticle>(article).await?;
    audit(&state, &user, AuditAction::Create, "knowledge_article", stored.id, to_details(&stored)).await;
    Ok(created(stored))
}

pub async fn update_article(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(mut changes): Json<KnowledgeArticleChanges>,
) -> ApiResult<Json<KnowledgeArticle>> {
    user.require(Module::Support)?;
    changes.views = None;
    let updated = state.store.update::<KnowledgeArticle>(id, changes.clone()).await?;
    audit(&state, &user, AuditAction::Update, "knowledge_article", id, to_details(&changes)).await;
    Ok(Json(updated))
}

pub async fn delete_article(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<StatusCode> {
    user.require(Module::Support)?;
    state.store.delete::<KnowledgeArticle>(id).await?;
    audit(&state, &user, AuditAction::Delete, "knowledge_article", id, Value::Null).await;
    Ok(StatusCode::NO_CONTENT)
}
