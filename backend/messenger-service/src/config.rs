use crate::error::AppError;
use crypto_core::MessageCipher;
use dotenvy::dotenv;
use std::env;

pub const DEFAULT_SEARCH_WINDOW: i64 = 200;
pub const DEFAULT_SEARCH_RESULT_LIMIT: usize = 50;
pub const DEFAULT_HISTORY_PAGE_LIMIT: i64 = 50;
pub const MAX_HISTORY_PAGE_LIMIT: i64 = 200;

/// Bounds for history paging and server-side search.
#[derive(Debug, Clone, Copy)]
pub struct MessageLimits {
    /// Newest rows scanned per search
    pub search_window: i64,
    pub search_result_limit: usize,
    pub history_page_limit: i64,
    pub history_max_limit: i64,
}

impl Default for MessageLimits {
    fn default() -> Self {
        Self {
            search_window: DEFAULT_SEARCH_WINDOW,
            search_result_limit: DEFAULT_SEARCH_RESULT_LIMIT,
            history_page_limit: DEFAULT_HISTORY_PAGE_LIMIT,
            history_max_limit: MAX_HISTORY_PAGE_LIMIT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    /// Built from `MESSAGE_KEY`; a bad key fails `from_env`
    pub message_cipher: MessageCipher,
    pub limits: MessageLimits,
}

fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenv().ok();
        let database_url =
            env::var("DATABASE_URL").map_err(|_| AppError::Config("DATABASE_URL missing".into()))?;
        let port = parse_or("PORT", 3000);
        let db_max_connections = parse_or("DB_MAX_CONNECTIONS", 10);

        let jwt_secret = env::var("JWT_SECRET")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| AppError::Config("JWT_SECRET missing".into()))?;

        let key_b64 = env::var("MESSAGE_KEY")
            .map_err(|_| AppError::Config("MESSAGE_KEY missing".into()))?;
        let message_cipher = MessageCipher::from_base64(&key_b64)
            .map_err(|e| AppError::Config(format!("MESSAGE_KEY: {e}")))?;

        let history_page_limit = parse_or("HISTORY_PAGE_LIMIT", DEFAULT_HISTORY_PAGE_LIMIT)
            .clamp(1, MAX_HISTORY_PAGE_LIMIT);
        let limits = MessageLimits {
            search_window: parse_or("SEARCH_WINDOW", DEFAULT_SEARCH_WINDOW).max(1),
            search_result_limit: parse_or("SEARCH_RESULT_LIMIT", DEFAULT_SEARCH_RESULT_LIMIT)
                .max(1),
            history_page_limit,
            history_max_limit: MAX_HISTORY_PAGE_LIMIT,
        };

        Ok(Self {
            database_url,
            port,
            db_max_connections,
            jwt_secret,
            message_cipher,
            limits,
        })
    }
}
