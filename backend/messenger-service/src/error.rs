use crate::middleware::error_handling;
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(AppError::status_code(self))
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        error_handling::into_response(self)
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error, Clone)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("server start failure: {0}")]
    StartServer(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("message cannot be empty")]
    EmptyMessage,

    #[error("reaction is required")]
    ReactionMissing,

    #[error("search query must be at least {min_len} characters")]
    SearchQueryTooShort { min_len: usize },

    #[error("unauthorized")]
    Unauthorized,

    #[error("you are not a participant of this chat")]
    NotParticipant,

    #[error("you cannot delete this message")]
    NotMessageOwner,

    #[error("message not found")]
    MessageNotFound,

    #[error("database error: {0}")]
    Database(String),

    #[error("encryption error: {0}")]
    Encryption(String),

    #[error("internal server error")]
    Internal,
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Database(e.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        AppError::StartServer(format!("migrations: {e}"))
    }
}

impl From<crypto_core::CryptoError> for AppError {
    fn from(e: crypto_core::CryptoError) -> Self {
        AppError::Encryption(e.to_string())
    }
}

impl AppError {
    /// Returns HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::BadRequest(_)
            | AppError::EmptyMessage
            | AppError::ReactionMissing
            | AppError::SearchQueryTooShort { .. } => 400,
            AppError::Unauthorized => 401,
            AppError::NotParticipant | AppError::NotMessageOwner => 403,
            AppError::MessageNotFound => 404,
            AppError::Config(_)
            | AppError::StartServer(_)
            | AppError::Database(_)
            | AppError::Encryption(_)
            | AppError::Internal => 500,
        }
    }
}
