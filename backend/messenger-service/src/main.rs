use actix_middleware::{JwtAuthMiddleware, MetricsMiddleware};
use actix_web::{web, App, HttpServer};
use crypto_core::jwt::JwtValidator;
use messenger_service::{
    config, db, error::AppError, logging, metrics,
    middleware::RepositoryAccounts,
    repository::{MessageRepository, PgMessageRepository},
    routes,
    services::MessageService,
    state::AppState,
};
use std::sync::Arc;
use tracing_actix_web::TracingLogger;

#[actix_web::main]
async fn main() -> Result<(), AppError> {
    logging::init_tracing();
    let cfg = Arc::new(config::Config::from_env()?);

    let cipher = Arc::new(cfg.message_cipher.clone());
    let jwt = Arc::new(JwtValidator::new(&cfg.jwt_secret));

    let pool = db::init_pool(&cfg.database_url, cfg.db_max_connections)
        .await
        .map_err(|e| AppError::StartServer(format!("db: {e}")))?;
    let repo: Arc<dyn MessageRepository> = Arc::new(PgMessageRepository::new(pool));

    let state = AppState {
        messages: MessageService::new(repo.clone(), cipher, cfg.limits),
    };
    let auth = JwtAuthMiddleware::new(jwt)
        .with_account_lookup(Arc::new(RepositoryAccounts::new(repo)));

    let port = cfg.port;
    tracing::info!(port, "starting messenger-service");

    HttpServer::new(move || {
        App::new()
            .wrap(MetricsMiddleware)
            .wrap(TracingLogger::default())
            .app_data(web::Data::new(state.clone()))
            .route("/health", web::get().to(routes::health))
            .route("/metrics", web::get().to(metrics::metrics_handler))
            .service(web::scope("/api").wrap(auth.clone()).configure(routes::configure))
    })
    .bind(("0.0.0.0", port))
    .map_err(|e| AppError::StartServer(format!("bind: {e}")))?
    .run()
    .await
    .map_err(|e| AppError::StartServer(format!("server: {e}")))
}
