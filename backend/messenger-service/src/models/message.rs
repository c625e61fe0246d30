use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const DEFAULT_MESSAGE_TYPE: &str = "text";

/// A message row joined with its sender's display fields.
///
/// `text` holds the stored envelope when read from the repository and the
/// decrypted plaintext once it has passed through `MessageService`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Message {
    pub id: i64,
    pub chat_id: i64,
    pub sender_id: Option<i64>,
    pub text: Option<String>,
    pub message_type: String,
    pub file_url: Option<String>,
    pub file_name: Option<String>,
    pub file_size: Option<i64>,
    pub file_type: Option<String>,
    pub voice_url: Option<String>,
    pub voice_duration: Option<i32>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub client_message_id: Option<String>,
    pub sender_name: Option<String>,
    pub sender_avatar: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SendMessageRequest {
    pub text: Option<String>,
    pub file_url: Option<String>,
    pub file_name: Option<String>,
    pub file_size: Option<i64>,
    pub file_type: Option<String>,
    pub voice_url: Option<String>,
    pub voice_duration: Option<i32>,
    pub message_type: Option<String>,
    /// Client-generated id used to drop replays of the same send
    pub client_message_id: Option<String>,
}

impl SendMessageRequest {
    pub fn is_empty(&self) -> bool {
        let blank = |v: &Option<String>| v.as_deref().map_or(true, str::is_empty);
        blank(&self.text) && blank(&self.file_url) && blank(&self.voice_url)
    }
}

/// Insert payload; `text` is already an envelope.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub chat_id: i64,
    pub sender_id: i64,
    pub text: Option<String>,
    pub message_type: String,
    pub file_url: Option<String>,
    pub file_name: Option<String>,
    pub file_size: Option<i64>,
    pub file_type: Option<String>,
    pub voice_url: Option<String>,
    pub voice_duration: Option<i32>,
    pub client_message_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct InsertOutcome {
    pub message: Message,
    /// False when `client_message_id` matched an existing row
    pub created: bool,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReactionRequest {
    pub reaction: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: Message,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub success: bool,
    pub message: String,
}
