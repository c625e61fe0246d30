use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_MESSAGE_TYPE: &str = "text";
pub const OFFLINE_ID_PREFIX: &str = "offline_";

/// What the user composed. Stored verbatim in the outbox and replayed as the
/// send request body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessagePayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_duration: Option<i32>,
    #[serde(default = "default_message_type")]
    pub message_type: String,
}

fn default_message_type() -> String {
    DEFAULT_MESSAGE_TYPE.to_string()
}

impl MessagePayload {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            message_type: default_message_type(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        let blank = |v: &Option<String>| v.as_deref().map_or(true, str::is_empty);
        blank(&self.text) && blank(&self.file_url) && blank(&self.voice_url)
    }
}

/// Body of `POST /api/messages/{chat_id}`.
#[derive(Debug, Clone, Serialize)]
pub struct SendRequest<'a> {
    #[serde(flatten)]
    pub payload: &'a MessagePayload,
    pub client_message_id: String,
}

/// An outbox entry before the store assigns its sequence number.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOutboxEntry {
    pub local_id: Uuid,
    pub chat_id: i64,
    pub payload: MessagePayload,
    /// Unix millis
    pub enqueued_at: i64,
}

impl NewOutboxEntry {
    pub fn new(chat_id: i64, payload: MessagePayload) -> Self {
        Self::with_local_id(Uuid::new_v4(), chat_id, payload)
    }

    pub fn with_local_id(local_id: Uuid, chat_id: i64, payload: MessagePayload) -> Self {
        Self {
            local_id,
            chat_id,
            payload,
            enqueued_at: Utc::now().timestamp_millis(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutboxEntry {
    /// Store-assigned and increasing. Delivery follows this order.
    pub seq: i64,
    pub local_id: Uuid,
    pub chat_id: i64,
    pub payload: MessagePayload,
    /// Wall-clock millis, shown to the user only.
    pub enqueued_at: i64,
}

impl OutboxEntry {
    pub fn from_new(seq: i64, entry: NewOutboxEntry) -> Self {
        Self {
            seq,
            local_id: entry.local_id,
            chat_id: entry.chat_id,
            payload: entry.payload,
            enqueued_at: entry.enqueued_at,
        }
    }

    pub fn placeholder_id(&self) -> String {
        placeholder_id(self.local_id)
    }
}

pub fn placeholder_id(local_id: Uuid) -> String {
    format!("{OFFLINE_ID_PREFIX}{local_id}")
}

/// `sending` is never persisted; it only marks the entry currently on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutboxStatus {
    Pending,
    Sending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutboxItem {
    pub entry: OutboxEntry,
    pub status: OutboxStatus,
}

/// A message as returned by the server, text already decrypted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerMessage {
    pub id: i64,
    #[serde(default)]
    pub chat_id: Option<i64>,
    #[serde(default)]
    pub sender_id: Option<i64>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default = "default_message_type")]
    pub message_type: String,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_size: Option<i64>,
    #[serde(default)]
    pub file_type: Option<String>,
    #[serde(default)]
    pub voice_url: Option<String>,
    #[serde(default)]
    pub voice_duration: Option<i32>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub client_message_id: Option<String>,
    #[serde(default)]
    pub sender_name: Option<String>,
    #[serde(default)]
    pub sender_avatar: Option<String>,
}

/// Who is signed in on this device; used to render queued messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: i64,
    pub name: String,
    pub avatar: Option<String>,
}

/// Optimistic message shown in the UI while its outbox entry is pending.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocalMessage {
    /// `offline_<local_id>`
    pub id: String,
    pub local_id: Uuid,
    pub chat_id: i64,
    #[serde(flatten)]
    pub payload: MessagePayload,
    pub status: OutboxStatus,
    pub created_at: DateTime<Utc>,
    pub sender_id: Option<i64>,
    pub sender_name: Option<String>,
    pub sender_avatar: Option<String>,
}

impl LocalMessage {
    pub fn from_entry(entry: &OutboxEntry, user: Option<&CurrentUser>) -> Self {
        let created_at = Utc
            .timestamp_millis_opt(entry.enqueued_at)
            .single()
            .unwrap_or_else(Utc::now);
        Self {
            id: entry.placeholder_id(),
            local_id: entry.local_id,
            chat_id: entry.chat_id,
            payload: entry.payload.clone(),
            status: OutboxStatus::Pending,
            created_at,
            sender_id: user.map(|u| u.id),
            sender_name: user.map(|u| u.name.clone()),
            sender_avatar: user.and_then(|u| u.avatar.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    Delivered(ServerMessage),
    Queued(LocalMessage),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Another drain holds the guard; nothing was sent
    AlreadyRunning,
    /// Offline or signed out
    Skipped,
    Completed { succeeded: usize, failed: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SyncState {
    Offline,
    OnlineIdle,
    OnlineDraining,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    pub state: SyncState,
    pub online: bool,
    pub sync_in_progress: bool,
    pub pending: usize,
    /// Outbox fell back to memory; entries may not survive a restart
    pub degraded: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadedMessages {
    pub messages: Vec<ServerMessage>,
    pub from_cache: bool,
}
