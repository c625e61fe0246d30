pub mod auth;
pub mod messages;

use actix_web::{web, HttpResponse};

/// Register every `/api` route. The caller wraps the scope with authentication.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(messages::search_messages)
        .service(messages::get_messages)
        .service(messages::send_message)
        .service(messages::add_reaction)
        .service(messages::remove_reaction)
        .service(messages::mark_read)
        .service(messages::delete_message)
        .service(auth::verify);
}

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().body("OK")
}
