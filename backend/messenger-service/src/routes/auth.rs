use crate::{error::AppError, models::UserProfile, state::AppState};
use actix_middleware::UserId;
use actix_web::{get, web, HttpResponse};
use serde::Serialize;

#[derive(Serialize)]
pub struct VerifyResponse {
    pub user: UserProfile,
}

/// GET /auth/verify
/// Token liveness check; also the client's connectivity probe
#[get("/auth/verify")]
pub async fn verify(state: web::Data<AppState>, user: UserId) -> Result<HttpResponse, AppError> {
    let account = state.messages.current_account(user.0).await?;
    Ok(HttpResponse::Ok().json(VerifyResponse {
        user: account.into(),
    }))
}
