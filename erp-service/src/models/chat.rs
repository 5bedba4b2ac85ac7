use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::defaults;

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::chat_rooms)]
#[serde(rename_all = "camelCase")]
pub struct ChatRoomData {
    pub name: String,
    pub description: Option<String>,
    #[serde(default = "defaults::channel")]
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default = "defaults::public")]
    pub visibility: String,
    pub created_by: Option<i32>,
    pub avatar_url: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default)]
    pub archived: bool,
}

record! {
    ChatRoom(ChatRoomData) in chat_rooms as "chat room";
    ChatRoomChanges {
        name: String,
        description: String,
        visibility: String,
        avatar_url: String,
        last_message_at: DateTime<Utc>,
        read_only: bool,
        archived: bool,
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::chat_room_participants)]
#[serde(rename_all = "camelCase")]
pub struct ChatParticipantData {
    #[serde(default)]
    pub room_id: i32,
    #[serde(default)]
    pub user_id: i32,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub is_owner: bool,
    #[serde(default)]
    pub is_moderator: bool,
    pub last_seen_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub muted: bool,
    #[serde(default = "defaults::notify_default")]
    pub notifications: String,
}

record! {
    ChatParticipant(ChatParticipantData) in chat_room_participants as "participant";
    ChatParticipantChanges {
        is_admin: bool,
        is_owner: bool,
        is_moderator: bool,
        last_seen_at: DateTime<Utc>,
        muted: bool,
        notifications: String,
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::chat_messages)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageData {
    #[serde(default)]
    pub room_id: i32,
    #[serde(default)]
    pub user_id: i32,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub is_system: bool,
    pub parent_id: Option<i32>,
    #[serde(default = "defaults::empty_array")]
    pub attachments: Value,
    #[serde(default = "defaults::empty_array")]
    pub mentions: Value,
    #[serde(default = "defaults::empty_object")]
    pub reactions: Value,
    pub edited_at: Option<DateTime<Utc>>,
    pub edited_by: Option<i32>,
}

record! {
    ChatMessage(ChatMessageData) in chat_messages as "message";
    ChatMessageChanges {
        content: String,
        is_read: bool,
        attachments: Value,
        mentions: Value,
        reactions: Value,
        edited_at: DateTime<Utc>,
        edited_by: i32,
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::chat_uploads)]
#[serde(rename_all = "camelCase")]
pub struct ChatUploadData {
    pub room_id: i32,
    pub user_id: i32,
    pub message_id: Option<i32>,
    pub file_name: String,
    pub original_name: String,
    pub mime_type: String,
    pub size: i64,
    pub file_url: String,
}

record! {
    ChatUpload(ChatUploadData) in chat_uploads as "upload";
    ChatUploadChanges {
        message_id: i32,
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::chat_user_preferences)]
#[serde(rename_all = "camelCase")]
pub struct ChatPreferencesData {
    #[serde(default)]
    pub user_id: i32,
    #[serde(default = "defaults::light")]
    pub theme: String,
    #[serde(default = "defaults::normal")]
    pub message_view_mode: String,
    #[serde(default = "defaults::yes")]
    pub show_avatars: bool,
    #[serde(default)]
    pub hide_usernames: bool,
    #[serde(default = "defaults::yes")]
    pub notification_sound: bool,
    #[serde(default = "defaults::all")]
    pub desktop_notifications: String,
    #[serde(default = "defaults::mentions")]
    pub email_notifications: String,
    #[serde(default = "defaults::empty_object")]
    pub preferences: Value,
}

impl ChatPreferencesData {
    /// What a user gets before saving any preference.
    pub fn defaults_for(user_id: i32) -> Self {
        ChatPreferencesData {
            user_id,
            theme: defaults::light(),
            message_view_mode: defaults::normal(),
            show_avatars: true,
            hide_usernames: false,
            notification_sound: true,
            desktop_notifications: defaults::all(),
            email_notifications: defaults::mentions(),
            preferences: defaults::empty_object(),
        }
    }
}

record! {
    ChatPreferences(ChatPreferencesData) in chat_user_preferences as "chat preferences";
    ChatPreferencesChanges {
        theme: String,
        message_view_mode: String,
        show_avatars: bool,
        hide_usernames: bool,
        notification_sound: bool,
        desktop_notifications: String,
        email_notifications: String,
        preferences: Value,
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::chat_audit_logs)]
#[serde(rename_all = "camelCase")]
pub struct ChatAuditLogData {
    pub user_id: Option<i32>,
    pub action: String,
    pub room_id: Option<i32>,
    pub message_id: Option<i32>,
    pub original_content: Option<String>,
    pub new_content: Option<String>,
}

record! {
    ChatAuditLog(ChatAuditLogData) in chat_audit_logs as "chat audit log";
}
