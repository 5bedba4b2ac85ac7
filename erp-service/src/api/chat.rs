//! Rooms, messages, uploads and the live event stream.
//!
//! Every write publishes a `ChatEvent` on the hub after it is stored, so a
//! client that reloads after an event always sees the change.

use std::convert::Infallible;
use std::path::Path as FsPath;
use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        Json,
    },
    routing::{delete, get, post},
    Router,
};
use chrono::Utc;
use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use shared::status::{ChatAction, RoomType, Visibility};
use shared::{Module, Page};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::admin::{sort_ascending, AuditPage, Pagination, AUDIT_PAGE_SIZE, SYSTEM_USER};
use super::{created, parse_instant, require_text, to_details, AppState};
use crate::auth::AuthUser;
use crate::chat_hub::{ChatEvent, EventKind, Subscription};
use crate::error::{ApiError, ApiResult};
use crate::models::*;
use crate::store::{ChatAuditEntry, ChatAuditFilter, ChatPurge, Record, Storage};

pub const DEFAULT_MESSAGE_LIMIT: i64 = 50;
pub const MAX_MESSAGE_LIMIT: i64 = 100;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/chat/users", get(list_chat_users))
        .route("/chat/rooms", get(list_rooms).post(create_room))
        .route("/chat/direct/:user_id", post(direct_room))
        .route(
            "/chat/rooms/:id/participants",
            get(list_participants).post(add_participant),
        )
        .route("/chat/rooms/:id/participants/:user_id", delete(remove_participant))
        .route("/chat/rooms/:id/messages", get(list_messages).post(send_message))
        .route("/chat/rooms/:id/read", post(mark_read))
        .route("/chat/rooms/:id/typing", post(typing))
        .route("/chat/messages/:id", axum::routing::patch(edit_message).delete(delete_message))
        .route("/chat/messages/:id/thread", get(thread))
        .route("/chat/messages/:id/reactions", post(toggle_reaction))
        .route("/chat/cleanup", delete(cleanup))
        .route("/chat/upload", post(upload))
        .route("/chat/upload/:id", delete(delete_upload))
        .route("/chat/:room_id/uploads", get(list_uploads))
        .route("/chat/preferences", get(get_preferences).put(put_preferences))
        .route("/chat/events", get(events))
        .route("/chat-audit-logs", get(chat_audit_logs))
}

/// Appends to the chat audit trail. Failures are logged and never fail the
/// request.
async fn chat_audit(
    state: &AppState,
    user: &AuthUser,
    action: ChatAction,
    message: &ChatMessage,
    original_content: Option<String>,
    new_content: Option<String>,
) {
    let entry = ChatAuditLogData {
        user_id: Some(user.id),
        action: action.to_string(),
        room_id: Some(message.data.room_id),
        message_id: Some(message.id),
        original_content,
        new_content,
    };
    if let Err(e) = state.store.create::<ChatAuditLog>(entry).await {
        warn!("Failed to record chat audit for message {}: {}", message.id, e);
    }
}

async fn membership(state: &AppState, room_id: i32, user_id: i32) -> ApiResult<ChatParticipant> {
    state.store.get::<ChatRoom>(room_id).await?;
    state
        .store
        .participant(room_id, user_id)
        .await?
        .ok_or_else(|| ApiError::Forbidden("not a participant of this room".into()))
}

async fn require_room_admin(state: &AppState, room_id: i32, user: &AuthUser) -> ApiResult<ChatParticipant> {
    let member = membership(state, room_id, user.id).await?;
    if member.data.is_admin || member.data.is_owner {
        Ok(member)
    } else {
        Err(ApiError::Forbidden("room admin required".into()))
    }
}

fn require_array(value: &Value, field: &str) -> ApiResult<()> {
    if value.is_array() {
        Ok(())
    } else {
        Err(ApiError::bad_request(format!("{field} must be an array")))
    }
}

// Users

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatUser {
    pub id: i32,
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub status: Option<String>,
    pub online: bool,
}

pub async fn list_chat_users(
    State(state): State<AppState>,
    _user: AuthUser,
) -> ApiResult<Json<Vec<ChatUser>>> {
    let users = state
        .store
        .all::<User>()
        .await?
        .into_iter()
        .filter(|u| u.data.active)
        .map(|u| ChatUser {
            online: state.hub.is_online(u.id),
            id: u.id,
            username: u.data.username,
            full_name: u.data.full_name,
            email: u.data.email,
            status: u.data.status,
        })
        .collect();
    Ok(Json(users))
}

// Rooms

pub async fn list_rooms(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Vec<ChatRoom>>> {
    Ok(Json(state.store.user_rooms(user.id).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRoom {
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub type_: Option<String>,
    pub visibility: Option<String>,
    #[serde(default)]
    pub participants: Vec<i32>,
}

fn participant_row(room_id: i32, user_id: i32, owner: bool) -> ChatParticipantData {
    ChatParticipantData {
        room_id,
        user_id,
        is_admin: owner,
        is_owner: owner,
        is_moderator: false,
        last_seen_at: None,
        muted: false,
        notifications: "default".into(),
    }
}

/// Stores the room, its owner and its members, then announces it.
async fn open_room(
    state: &AppState,
    owner: &AuthUser,
    data: ChatRoomData,
    members: &[i32],
) -> ApiResult<ChatRoom> {
    for &member in members {
        state.store.get::<User>(member).await?;
    }
    let room = state.store.create::<ChatRoom>(data).await?;
    state
        .store
        .create::<ChatParticipant>(participant_row(room.id, owner.id, true))
        .await?;
    for &member in members.iter().filter(|&&m| m != owner.id) {
        state
            .store
            .create::<ChatParticipant>(participant_row(room.id, member, false))
            .await?;
    }
    info!("Chat room {} '{}' opened by {}", room.id, room.data.name, owner.username);
    state
        .hub
        .publish(ChatEvent::room(EventKind::RoomCreated, room.id, to_details(&room)));
    Ok(room)
}

pub async fn create_room(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<NewRoom>,
) -> ApiResult<(StatusCode, Json<ChatRoom>)> {
    require_text(&body.name, "name", 1)?;
    let kind: RoomType = body.type_.as_deref().unwrap_or("channel").parse()?;
    let visibility: Visibility = body.visibility.as_deref().unwrap_or("public").parse()?;
    if kind == RoomType::Direct {
        return Err(ApiError::bad_request("direct rooms are opened through /chat/direct"));
    }
    let mut members = body.participants;
    members.sort_unstable();
    members.dedup();
    let data = ChatRoomData {
        name: body.name.trim().to_string(),
        description: body.description,
        type_: kind.to_string(),
        visibility: visibility.to_string(),
        created_by: Some(user.id),
        avatar_url: None,
        last_message_at: None,
        read_only: false,
        archived: false,
    };
    let room = open_room(&state, &user, data, &members).await?;
    Ok(created(room))
}

/// Returns the existing direct room of the two users or opens one.
pub async fn direct_room(
    State(state): State<AppState>,
    user: AuthUser,
    Path(other_id): Path<i32>,
) -> ApiResult<Json<ChatRoom>> {
    if other_id == user.id {
        return Err(ApiError::bad_request("cannot open a direct room with yourself"));
    }
    let other = state.store.get::<User>(other_id).await?;
    let direct = RoomType::Direct.as_str();
    for room in state.store.user_rooms(user.id).await? {
        if room.data.type_ != direct {
            continue;
        }
        let members = state.store.room_participants(room.id).await?;
        if members.len() == 2 && members.iter().any(|p| p.data.user_id == other_id) {
            return Ok(Json(room));
        }
    }
    let data = ChatRoomData {
        name: format!("{} & {}", user.username, other.data.username),
        description: None,
        type_: direct.to_string(),
        visibility: Visibility::Private.to_string(),
        created_by: Some(user.id),
        avatar_url: None,
        last_message_at: None,
        read_only: false,
        archived: false,
    };
    Ok(Json(open_room(&state, &user, data, &[other_id]).await?))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantView {
    #[serde(flatten)]
    pub participant: ChatParticipant,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub online: bool,
}

/// Members see the list; so does anyone for a public room.
pub async fn list_participants(
    State(state): State<AppState>,
    user: AuthUser,
    Path(room_id): Path<i32>,
) -> ApiResult<Json<Vec<ParticipantView>>> {
    let room = state.store.get::<ChatRoom>(room_id).await?;
    let members = state.store.room_participants(room_id).await?;
    let is_member = members.iter().any(|p| p.data.user_id == user.id);
    if !is_member && room.data.visibility != Visibility::Public.as_str() {
        return Err(ApiError::Forbidden("not a participant of this room".into()));
    }
    let mut views = Vec::with_capacity(members.len());
    for participant in members {
        let profile = state.store.find::<User>(participant.data.user_id).await?;
        views.push(ParticipantView {
            online: state.hub.is_online(participant.data.user_id),
            username: profile.as_ref().map(|u| u.data.username.clone()),
            full_name: profile.map(|u| u.data.full_name),
            participant,
        });
    }
    Ok(Json(views))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantBody {
    pub user_id: i32,
}

/// Room admins add anyone. A user may join a public channel or team room on
/// their own.
pub async fn add_participant(
    State(state): State<AppState>,
    user: AuthUser,
    Path(room_id): Path<i32>,
    Json(body): Json<ParticipantBody>,
) -> ApiResult<(StatusCode, Json<ChatParticipant>)> {
    let room = state.store.get::<ChatRoom>(room_id).await?;
    if room.data.type_ == RoomType::Direct.as_str() {
        return Err(ApiError::bad_request("direct rooms have fixed participants"));
    }
    let self_join = body.user_id == user.id && room.data.visibility == Visibility::Public.as_str();
    if !self_join {
        require_room_admin(&state, room_id, &user).await?;
    }
    state.store.get::<User>(body.user_id).await?;
    if state.store.participant(room_id, body.user_id).await?.is_some() {
        return Err(ApiError::Conflict("user already participates in this room".into()));
    }
    let participant = state
        .store
        .create::<ChatParticipant>(participant_row(room_id, body.user_id, false))
        .await?;
    Ok(created(participant))
}

/// Room admins remove members; anyone may leave. The owner stays.
pub async fn remove_participant(
    State(state): State<AppState>,
    user: AuthUser,
    Path((room_id, user_id)): Path<(i32, i32)>,
) -> ApiResult<StatusCode> {
    if user_id != user.id {
        require_room_admin(&state, room_id, &user).await?;
    }
    let target = state
        .store
        .participant(room_id, user_id)
        .await?
        .ok_or_else(|| ApiError::not_found(ChatParticipant::ENTITY))?;
    if target.data.is_owner {
        return Err(ApiError::bad_request("the room owner cannot be removed"));
    }
    state.store.delete::<ChatParticipant>(target.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    pub message: String,
    #[serde(flatten)]
    pub removed: ChatPurge,
}

/// Clears every message and every room except the oldest channel, which
/// stays as the default room. Uploaded files go first.
pub async fn cleanup(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<CleanupResponse>> {
    user.require(Module::Admin)?;
    let rooms = state.store.all::<ChatRoom>().await?;
    let keep = rooms
        .iter()
        .filter(|r| r.data.type_ == RoomType::Channel.as_str())
        .min_by_key(|r| (r.created_at, r.id))
        .map(|r| r.id);
    for upload in state.store.all::<ChatUpload>().await? {
        remove_stored_file(&state, &upload.data.file_name).await;
    }
    let removed = state.store.purge_chat(keep).await?;
    info!(
        "Chat cleanup by {}: {} messages, {} rooms removed",
        user.username, removed.messages, removed.rooms
    );
    Ok(Json(CleanupResponse { message: "chat cleaned up".into(), removed }))
}

// Messages

#[derive(Debug, Default, Deserialize)]
pub struct MessageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn list_messages(
    State(state): State<AppState>,
    user: AuthUser,
    Path(room_id): Path<i32>,
    Query(query): Query<MessageQuery>,
) -> ApiResult<Json<Vec<ChatMessage>>> {
    membership(&state, room_id, user.id).await?;
    let limit = query.limit.unwrap_or(DEFAULT_MESSAGE_LIMIT).clamp(1, MAX_MESSAGE_LIMIT);
    let offset = query.offset.unwrap_or(0).max(0);
    Ok(Json(state.store.room_messages(room_id, limit, offset).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessage {
    #[serde(default)]
    pub content: String,
    pub parent_id: Option<i32>,
    pub mentions: Option<Value>,
    pub attachments: Option<Value>,
}

/// Stores a message, bumps the room's activity and tells the room.
async fn post_message(
    state: &AppState,
    user: &AuthUser,
    data: ChatMessageData,
) -> ApiResult<ChatMessage> {
    let room_id = data.room_id;
    let message = state.store.create::<ChatMessage>(data).await?;
    let bump = ChatRoomChanges {
        last_message_at: Some(message.created_at),
        ..Default::default()
    };
    state.store.update::<ChatRoom>(room_id, bump).await?;
    chat_audit(state, user, ChatAction::Send, &message, None, Some(message.data.content.clone())).await;
    state
        .hub
        .publish(ChatEvent::room(EventKind::Message, room_id, to_details(&message)));
    Ok(message)
}

pub async fn send_message(
    State(state): State<AppState>,
    user: AuthUser,
    Path(room_id): Path<i32>,
    Json(body): Json<NewMessage>,
) -> ApiResult<(StatusCode, Json<ChatMessage>)> {
    membership(&state, room_id, user.id).await?;
    require_text(&body.content, "content", 1)?;
    let room = state.store.get::<ChatRoom>(room_id).await?;
    if room.data.read_only || room.data.archived {
        return Err(ApiError::Forbidden("room does not accept messages".into()));
    }
    if let Some(parent_id) = body.parent_id {
        let parent = state.store.get::<ChatMessage>(parent_id).await?;
        if parent.data.room_id != room_id {
            return Err(ApiError::bad_request("parent message belongs to another room"));
        }
    }
    let mentions = body.mentions.unwrap_or_else(|| json!([]));
    let attachments = body.attachments.unwrap_or_else(|| json!([]));
    require_array(&mentions, "mentions")?;
    require_array(&attachments, "attachments")?;

    let data = ChatMessageData {
        room_id,
        user_id: user.id,
        content: body.content,
        is_read: false,
        is_system: false,
        parent_id: body.parent_id,
        attachments,
        mentions,
        reactions: json!({}),
        edited_at: None,
        edited_by: None,
    };
    Ok(created(post_message(&state, &user, data).await?))
}

/// Replies to a message, oldest first.
pub async fn thread(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<Json<Vec<ChatMessage>>> {
    let parent = state.store.get::<ChatMessage>(id).await?;
    membership(&state, parent.data.room_id, user.id).await?;
    Ok(Json(state.store.thread(id).await?))
}

#[derive(Debug, Deserialize)]
pub struct EditBody {
    pub content: String,
}

pub async fn edit_message(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(body): Json<EditBody>,
) -> ApiResult<Json<ChatMessage>> {
    let current = state.store.get::<ChatMessage>(id).await?;
    if current.data.user_id != user.id {
        return Err(ApiError::Forbidden("only the author can edit a message".into()));
    }
    require_text(&body.content, "content", 1)?;
    let changes = ChatMessageChanges {
        content: Some(body.content.clone()),
        edited_at: Some(Utc::now()),
        edited_by: Some(user.id),
        ..Default::default()
    };
    let updated = state.store.update::<ChatMessage>(id, changes).await?;
    chat_audit(
        &state,
        &user,
        ChatAction::Edit,
        &updated,
        Some(current.data.content),
        Some(body.content),
    )
    .await;
    state.hub.publish(ChatEvent::room(
        EventKind::MessageUpdated,
        updated.data.room_id,
        to_details(&updated),
    ));
    Ok(Json(updated))
}

/// The author or an admin of the room may delete.
pub async fn delete_message(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<StatusCode> {
    let message = state.store.get::<ChatMessage>(id).await?;
    let room_id = message.data.room_id;
    if message.data.user_id != user.id {
        require_room_admin(&state, room_id, &user).await?;
    }
    state.store.delete::<ChatMessage>(id).await?;
    chat_audit(&state, &user, ChatAction::Delete, &message, Some(message.data.content.clone()), None).await;
    state.hub.publish(ChatEvent::room(
        EventKind::MessageDeleted,
        room_id,
        json!({ "id": id, "roomId": room_id }),
    ));
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct ReactionBody {
    pub emoji: String,
}

/// Adds `user_id` under `emoji`, or removes it when already there. Emojis
/// nobody uses any more disappear from the map.
pub fn toggle_reaction_in(reactions: &Value, emoji: &str, user_id: i32) -> Value {
    let mut map: Map<String, Value> = reactions.as_object().cloned().unwrap_or_default();
    let mut users: Vec<Value> = map
        .get(emoji)
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let before = users.len();
    users.retain(|u| u.as_i64() != Some(i64::from(user_id)));
    if users.len() == before {
        users.push(json!(user_id));
    }
    if users.is_empty() {
        map.remove(emoji);
    } else {
        map.insert(emoji.to_string(), Value::Array(users));
    }
    Value::Object(map)
}

pub async fn toggle_reaction(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(body): Json<ReactionBody>,
) -> ApiResult<Json<ChatMessage>> {
    let emoji = body.emoji.trim();
    if emoji.is_empty() {
        return Err(ApiError::bad_request("emoji is required"));
    }
    let message = state.store.get::<ChatMessage>(id).await?;
    membership(&state, message.data.room_id, user.id).await?;
    let changes = ChatMessageChanges {
        reactions: Some(toggle_reaction_in(&message.data.reactions, emoji, user.id)),
        ..Default::default()
    };
    let updated = state.store.update::<ChatMessage>(id, changes).await?;
    state.hub.publish(ChatEvent::room(
        EventKind::Reaction,
        updated.data.room_id,
        json!({ "messageId": id, "reactions": updated.data.reactions }),
    ));
    Ok(Json(updated))
}

pub async fn mark_read(
    State(state): State<AppState>,
    user: AuthUser,
    Path(room_id): Path<i32>,
) -> ApiResult<Json<Value>> {
    membership(&state, room_id, user.id).await?;
    let marked = state.store.mark_room_read(room_id, user.id, Utc::now()).await?;
    Ok(Json(json!({ "marked": marked })))
}

pub async fn typing(
    State(state): State<AppState>,
    user: AuthUser,
    Path(room_id): Path<i32>,
) -> ApiResult<StatusCode> {
    membership(&state, room_id, user.id).await?;
    state.hub.publish(ChatEvent::room(
        EventKind::Typing,
        room_id,
        json!({ "roomId": room_id, "userId": user.id, "username": user.username }),
    ));
    Ok(StatusCode::NO_CONTENT)
}

// Audit trail

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatAuditQuery {
    pub user_id: Option<i32>,
    pub room_id: Option<i32>,
    pub action: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

pub async fn chat_audit_logs(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ChatAuditQuery>,
) -> ApiResult<Json<AuditPage<ChatAuditEntry>>> {
    user.require(Module::Admin)?;
    let page = Page::new(query.page, query.limit, AUDIT_PAGE_SIZE);
    let action = query
        .action
        .filter(|a| !a.trim().is_empty())
        .map(|a| a.parse::<ChatAction>().map(|a| a.to_string()))
        .transpose()?;
    let filter = ChatAuditFilter {
        user_id: query.user_id,
        room_id: query.room_id,
        action,
        from: query
            .start_date
            .filter(|d| !d.is_empty())
            .map(|d| parse_instant(&d, false))
            .transpose()?,
        until: query
            .end_date
            .filter(|d| !d.is_empty())
            .map(|d| parse_instant(&d, true))
            .transpose()?,
        ascending: sort_ascending(query.sort_order.as_deref())?,
        page,
    };
    let (entries, total) = state.store.search_chat_audit_logs(filter).await?;
    let logs = entries
        .into_iter()
        .map(|mut entry| {
            entry.username.get_or_insert_with(|| SYSTEM_USER.to_string());
            entry
        })
        .collect();
    Ok(Json(AuditPage { logs, pagination: Pagination::new(page, total) }))
}

// Uploads

/// `<uuid>.<ext>`, keeping the extension of the client's file name.
pub fn stored_file_name(original: &str) -> String {
    let id = Uuid::new_v4();
    match FsPath::new(original)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
    {
        Some(ext) => format!("{id}.{}", ext.to_ascii_lowercase()),
        None => id.to_string(),
    }
}

async fn remove_stored_file(state: &AppState, file_name: &str) {
    let path = state.config.uploads_dir.join(file_name);
    match tokio::fs::remove_file(&path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("upload {} already gone", path.display());
        }
        Err(e) => warn!("Failed to remove upload {}: {}", path.display(), e),
    }
}

struct IncomingFile {
    original_name: String,
    mime_type: String,
    bytes: Vec<u8>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub upload: ChatUpload,
    pub message: ChatMessage,
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError::bad_request(format!("invalid upload: {e}"))
}

/// Multipart `roomId` and `file`. The file lands in the uploads directory
/// and a message carrying it is posted to the room.
pub async fn upload(
    State(state): State<AppState>,
    user: AuthUser,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<UploadResponse>)> {
    let mut room_id: Option<i32> = None;
    let mut file: Option<IncomingFile> = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.name() {
            Some("roomId") => {
                let text = field.text().await.map_err(multipart_error)?;
                let id = text
                    .trim()
                    .parse()
                    .map_err(|_| ApiError::bad_request("roomId must be a number"))?;
                room_id = Some(id);
            }
            Some("file") => {
                let original_name = field.file_name().unwrap_or("file").to_string();
                let mime_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?.to_vec();
                file = Some(IncomingFile { original_name, mime_type, bytes });
            }
            _ => {}
        }
    }
    let room_id = room_id.ok_or_else(|| ApiError::bad_request("roomId is required"))?;
    let file = file.ok_or_else(|| ApiError::bad_request("file is required"))?;
    if file.bytes.is_empty() {
        return Err(ApiError::bad_request("file is empty"));
    }
    if file.bytes.len() > state.config.max_upload_bytes {
        return Err(ApiError::bad_request(format!(
            "file exceeds {} MB",
            state.config.max_upload_bytes / (1024 * 1024)
        )));
    }
    membership(&state, room_id, user.id).await?;

    let file_name = stored_file_name(&file.original_name);
    let dir = &state.config.uploads_dir;
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| ApiError::Internal(format!("cannot create {}: {e}", dir.display())))?;
    tokio::fs::write(dir.join(&file_name), &file.bytes)
        .await
        .map_err(|e| ApiError::Internal(format!("cannot store upload: {e}")))?;

    let file_url = format!("/uploads/{file_name}");
    let size = i64::try_from(file.bytes.len()).unwrap_or(i64::MAX);
    let attachment = json!({
        "fileName": file_name,
        "originalName": file.original_name,
        "mimeType": file.mime_type,
        "size": size,
        "url": file_url,
    });
    let data = ChatMessageData {
        room_id,
        user_id: user.id,
        content: file.original_name.clone(),
        is_read: false,
        is_system: false,
        parent_id: None,
        attachments: json!([attachment]),
        mentions: json!([]),
        reactions: json!({}),
        edited_at: None,
        edited_by: None,
    };
    let message = match post_message(&state, &user, data).await {
        Ok(message) => message,
        Err(e) => {
            remove_stored_file(&state, &file_name).await;
            return Err(e);
        }
    };
    let upload = state
        .store
        .create::<ChatUpload>(ChatUploadData {
            room_id,
            user_id: user.id,
            message_id: Some(message.id),
            file_name,
            original_name: file.original_name,
            mime_type: file.mime_type,
            size,
            file_url,
        })
        .await?;
    Ok(created(UploadResponse { upload, message }))
}

pub async fn list_uploads(
    State(state): State<AppState>,
    user: AuthUser,
    Path(room_id): Path<i32>,
) -> ApiResult<Json<Vec<ChatUpload>>> {
    membership(&state, room_id, user.id).await?;
    Ok(Json(state.store.room_uploads(room_id).await?))
}

pub async fn delete_upload(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<StatusCode> {
    let upload = state.store.get::<ChatUpload>(id).await?;
    if upload.data.user_id != user.id {
        return Err(ApiError::Forbidden("only the uploader can delete a file".into()));
    }
    remove_stored_file(&state, &upload.data.file_name).await;
    state.store.delete::<ChatUpload>(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Preferences

pub async fn get_preferences(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<ChatPreferencesData>> {
    let stored = state.store.chat_preferences(user.id).await?;
    Ok(Json(stored.map_or_else(|| ChatPreferencesData::defaults_for(user.id), |p| p.data)))
}

pub async fn put_preferences(
    State(state): State<AppState>,
    user: AuthUser,
    Json(changes): Json<ChatPreferencesChanges>,
) -> ApiResult<Json<ChatPreferencesData>> {
    let saved = match state.store.chat_preferences(user.id).await? {
        Some(current) => state.store.update::<ChatPreferences>(current.id, changes).await?,
        None => {
            let mut fresh = ChatPreferences::assemble(0, ChatPreferencesData::defaults_for(user.id), Utc::now());
            fresh.apply(changes);
            state.store.create::<ChatPreferences>(fresh.data).await?
        }
    };
    Ok(Json(saved.data))
}

// Live events

/// Waits for the next event this user may see. Room events go to the room's
/// participants; events without a room go to everyone.
async fn next_event(sub: &mut Subscription, store: &Arc<dyn Storage>) -> Option<Event> {
    loop {
        let event = match sub.receiver.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                debug!("event stream of user {} skipped {} events", sub.user_id(), skipped);
                continue;
            }
            Err(RecvError::Closed) => return None,
        };
        if event.kind == EventKind::Typing && event.payload["userId"] == json!(sub.user_id()) {
            continue;
        }
        if let Some(room_id) = event.room_id {
            match store.participant(room_id, sub.user_id()).await {
                Ok(Some(_)) => {}
                Ok(None) => continue,
                Err(e) => {
                    warn!("membership check failed for room {}: {}", room_id, e);
                    continue;
                }
            }
        }
        match Event::default().event(event.kind.name()).json_data(&event.payload) {
            Ok(sse) => return Some(sse),
            Err(e) => warn!("cannot encode {} event: {}", event.kind.name(), e),
        }
    }
}

pub async fn events(
    State(state): State<AppState>,
    user: AuthUser,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscription = state.hub.subscribe(user.id);
    let store = Arc::clone(&state.store);
    let stream = stream::unfold((subscription, store), |(mut sub, store)| async move {
        let event = next_event(&mut sub, &store).await?;
        Some((Ok(event), (sub, store)))
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}
