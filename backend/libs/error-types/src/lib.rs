use serde::{Deserialize, Serialize};

/// Uniform JSON error body returned by every messenger endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short HTTP reason, e.g. "Bad Request"
    pub error: String,

    /// Human-readable message, safe to show to the user
    pub message: String,

    pub status: u16,

    /// One of the constants in [`error_types`]
    pub error_type: String,

    /// One of the constants in [`error_codes`]
    pub code: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,

    /// ISO 8601
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error: &str, message: &str, status: u16, error_type: &str, code: &str) -> Self {
        Self {
            error: error.to_string(),
            message: message.to_string(),
            status,
            error_type: error_type.to_string(),
            code: code.to_string(),
            details: None,
            trace_id: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn with_details(mut self, details: String) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_trace_id(mut self, trace_id: String) -> Self {
        self.trace_id = Some(trace_id);
        self
    }
}

pub mod error_codes {
    // Authentication
    pub const TOKEN_MISSING: &str = "TOKEN_MISSING";
    pub const TOKEN_INVALID: &str = "TOKEN_INVALID";
    pub const USER_NOT_FOUND: &str = "USER_NOT_FOUND";
    pub const USER_BANNED: &str = "USER_BANNED";

    // Messages
    pub const MESSAGE_EMPTY: &str = "MESSAGE_EMPTY";
    pub const MESSAGE_NOT_FOUND: &str = "MESSAGE_NOT_FOUND";
    pub const NOT_CHAT_MEMBER: &str = "NOT_CHAT_MEMBER";
    pub const NOT_MESSAGE_OWNER: &str = "NOT_MESSAGE_OWNER";
    pub const SEARCH_QUERY_TOO_SHORT: &str = "SEARCH_QUERY_TOO_SHORT";
    pub const REACTION_MISSING: &str = "REACTION_MISSING";
    pub const MESSAGE_SEND_FAILED: &str = "MESSAGE_SEND_FAILED";

    // System
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const DATABASE_ERROR: &str = "DATABASE_ERROR";
    pub const INTERNAL_SERVER_ERROR: &str = "INTERNAL_SERVER_ERROR";
}

pub mod error_types {
    pub const VALIDATION_ERROR: &str = "validation_error";
    pub const AUTHENTICATION_ERROR: &str = "authentication_error";
    pub const AUTHORIZATION_ERROR: &str = "authorization_error";
    pub const NOT_FOUND_ERROR: &str = "not_found_error";
    pub const SERVER_ERROR: &str = "server_error";
}
