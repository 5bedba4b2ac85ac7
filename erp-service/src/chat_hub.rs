//! Fan-out of chat events to connected event-stream clients.
//!
//! Every handler that changes chat state publishes a `ChatEvent`; each SSE
//! connection holds a broadcast receiver and filters by room membership.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::broadcast;
use tracing::debug;

pub const CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    Message,
    MessageUpdated,
    MessageDeleted,
    Reaction,
    Typing,
    RoomCreated,
    Presence,
}

impl EventKind {
    /// SSE `event:` field.
    pub fn name(self) -> &'static str {
        match self {
            EventKind::Message => "message",
            EventKind::MessageUpdated => "messageUpdated",
            EventKind::MessageDeleted => "messageDeleted",
            EventKind::Reaction => "reaction",
            EventKind::Typing => "typing",
            EventKind::RoomCreated => "roomCreated",
            EventKind::Presence => "presence",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatEvent {
    pub kind: EventKind,
    /// `None` for events every user receives, such as presence changes.
    pub room_id: Option<i32>,
    pub payload: Value,
}

impl ChatEvent {
    pub fn room(kind: EventKind, room_id: i32, payload: Value) -> Self {
        ChatEvent { kind, room_id: Some(room_id), payload }
    }
}

pub struct ChatHub {
    sender: broadcast::Sender<ChatEvent>,
    online: Mutex<HashMap<i32, usize>>,
}

impl Default for ChatHub {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatHub {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        ChatHub { sender, online: Mutex::new(HashMap::new()) }
    }

    /// Sends to whoever is listening. Nobody listening is not an error.
    pub fn publish(&self, event: ChatEvent) {
        if self.sender.send(event).is_err() {
            debug!("chat event dropped, no subscribers");
        }
    }

    fn online_map(&self) -> MutexGuard<'_, HashMap<i32, usize>> {
        self.online.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_online(&self, user_id: i32) -> bool {
        self.online_map().contains_key(&user_id)
    }

    /// Opens a stream for `user_id`. The user counts as online until the
    /// returned subscription and every other one they hold are dropped.
    pub fn subscribe(self: &Arc<Self>, user_id: i32) -> Subscription {
        let receiver = self.sender.subscribe();
        let first = {
            let mut online = self.online_map();
            let count = online.entry(user_id).or_insert(0);
            *count += 1;
            *count == 1
        };
        if first {
            self.publish(presence(user_id, true));
        }
        Subscription {
            receiver,
            guard: PresenceGuard { hub: Arc::clone(self), user_id },
        }
    }

    fn disconnect(&self, user_id: i32) {
        let last = {
            let mut online = self.online_map();
            match online.get_mut(&user_id) {
                Some(count) if *count > 1 => {
                    *count -= 1;
                    false
                }
                Some(_) => {
                    online.remove(&user_id);
                    true
                }
                None => false,
            }
        };
        if last {
            self.publish(presence(user_id, false));
        }
    }
}

fn presence(user_id: i32, online: bool) -> ChatEvent {
    ChatEvent {
        kind: EventKind::Presence,
        room_id: None,
        payload: json!({ "userId": user_id, "online": online }),
    }
}

struct PresenceGuard {
    hub: Arc<ChatHub>,
    user_id: i32,
}

impl Drop for PresenceGuard {
    fn drop(&mut self) {
        self.hub.disconnect(self.user_id);
    }
}

pub struct Subscription {
    pub receiver: broadcast::Receiver<ChatEvent>,
    guard: PresenceGuard,
}

impl Subscription {
    pub fn user_id(&self) -> i32 {
        self.guard.user_id
    }
}
