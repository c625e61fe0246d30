use crate::error::AppError;
use actix_web::{http::StatusCode, HttpResponse};
use error_types::{error_codes, error_types as kinds, ErrorResponse};

/// Map domain errors to HTTP status and the shared error body.
///
/// Server-side failures never echo their internal message to the client.
pub fn map_error(err: &AppError) -> (StatusCode, ErrorResponse) {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let (error_type, code) = match err {
        AppError::BadRequest(_) => (kinds::VALIDATION_ERROR, error_codes::VALIDATION_ERROR),
        AppError::EmptyMessage => (kinds::VALIDATION_ERROR, error_codes::MESSAGE_EMPTY),
        AppError::ReactionMissing => (kinds::VALIDATION_ERROR, error_codes::REACTION_MISSING),
        AppError::SearchQueryTooShort { .. } => {
            (kinds::VALIDATION_ERROR, error_codes::SEARCH_QUERY_TOO_SHORT)
        }
        AppError::Unauthorized => (kinds::AUTHENTICATION_ERROR, error_codes::TOKEN_INVALID),
        AppError::NotParticipant => (kinds::AUTHORIZATION_ERROR, error_codes::NOT_CHAT_MEMBER),
        AppError::NotMessageOwner => (kinds::AUTHORIZATION_ERROR, error_codes::NOT_MESSAGE_OWNER),
        AppError::MessageNotFound => (kinds::NOT_FOUND_ERROR, error_codes::MESSAGE_NOT_FOUND),
        AppError::Database(_) => (kinds::SERVER_ERROR, error_codes::DATABASE_ERROR),
        AppError::Encryption(_) => (kinds::SERVER_ERROR, error_codes::MESSAGE_SEND_FAILED),
        AppError::Config(_) | AppError::StartServer(_) | AppError::Internal => {
            (kinds::SERVER_ERROR, error_codes::INTERNAL_SERVER_ERROR)
        }
    };

    let message = match err {
        AppError::Encryption(_) => "failed to send message".to_string(),
        AppError::Database(_)
        | AppError::Config(_)
        | AppError::StartServer(_)
        | AppError::Internal => "internal server error".to_string(),
        other => other.to_string(),
    };

    let response = ErrorResponse::new(
        status.canonical_reason().unwrap_or("Error"),
        &message,
        status.as_u16(),
        error_type,
        code,
    );

    (status, response)
}

pub fn into_response(err: &AppError) -> HttpResponse {
    let (status, response) = map_error(err);
    if status.is_server_error() {
        tracing::error!(error = %err, "request failed");
    }
    HttpResponse::build(status).json(response)
}
