use crate::{
    error::AppError,
    models::{
        HistoryQuery, MessageResponse, MessagesResponse, ReactionRequest, SearchQuery,
        SendMessageRequest, StatusResponse,
    },
    state::AppState,
};
use actix_middleware::UserId;
use actix_web::{delete, get, post, put, web, HttpResponse};

/// POST /messages/{chat_id}
/// Send a message; text is encrypted before it is stored
#[post("/messages/{chat_id}")]
pub async fn send_message(
    state: web::Data<AppState>,
    chat_id: web::Path<i64>,
    user: UserId,
    body: web::Json<SendMessageRequest>,
) -> Result<HttpResponse, AppError> {
    let sent = state
        .messages
        .send_message(user.0, chat_id.into_inner(), body.into_inner())
        .await?;

    let response = MessageResponse {
        message: sent.message,
    };
    if sent.created {
        Ok(HttpResponse::Created().json(response))
    } else {
        Ok(HttpResponse::Ok().json(response))
    }
}

/// GET /messages/{chat_id}?limit=50&offset=0
#[get("/messages/{chat_id}")]
pub async fn get_messages(
    state: web::Data<AppState>,
    chat_id: web::Path<i64>,
    user: UserId,
    query: web::Query<HistoryQuery>,
) -> Result<HttpResponse, AppError> {
    let messages = state
        .messages
        .get_messages(user.0, chat_id.into_inner(), query.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(MessagesResponse { messages }))
}

/// GET /messages/{chat_id}/search?q=
#[get("/messages/{chat_id}/search")]
pub async fn search_messages(
    state: web::Data<AppState>,
    chat_id: web::Path<i64>,
    user: UserId,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse, AppError> {
    let messages = state
        .messages
        .search_messages(user.0, chat_id.into_inner(), query.q.as_deref())
        .await?;
    Ok(HttpResponse::Ok().json(MessagesResponse { messages }))
}

/// POST /messages/{message_id}/react
/// Replaces the caller's previous reaction
#[post("/messages/{message_id}/react")]
pub async fn add_reaction(
    state: web::Data<AppState>,
    message_id: web::Path<i64>,
    user: UserId,
    body: web::Json<ReactionRequest>,
) -> Result<HttpResponse, AppError> {
    state
        .messages
        .add_reaction(user.0, message_id.into_inner(), body.reaction.as_deref())
        .await?;
    Ok(HttpResponse::Ok().json(StatusResponse {
        success: true,
        message: "reaction added".into(),
    }))
}

#[delete("/messages/{message_id}/react")]
pub async fn remove_reaction(
    state: web::Data<AppState>,
    message_id: web::Path<i64>,
    user: UserId,
) -> Result<HttpResponse, AppError> {
    state
        .messages
        .remove_reaction(user.0, message_id.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(StatusResponse {
        success: true,
        message: "reaction removed".into(),
    }))
}

/// PUT /messages/{chat_id}/read
#[put("/messages/{chat_id}/read")]
pub async fn mark_read(
    state: web::Data<AppState>,
    chat_id: web::Path<i64>,
    user: UserId,
) -> Result<HttpResponse, AppError> {
    state.messages.mark_read(user.0, chat_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(StatusResponse {
        success: true,
        message: "messages marked as read".into(),
    }))
}

/// DELETE /messages/{message_id}
#[delete("/messages/{message_id}")]
pub async fn delete_message(
    state: web::Data<AppState>,
    message_id: web::Path<i64>,
    user: UserId,
) -> Result<HttpResponse, AppError> {
    state
        .messages
        .delete_message(user.0, message_id.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(StatusResponse {
        success: true,
        message: "message deleted".into(),
    }))
}
