//! # Actix Middleware Library
//!
//! Shared middleware for messenger Actix services
//!
//! ## Modules
//! - `jwt_auth`: bearer-token authentication and the `UserId` extractor
//! - `metrics`: Prometheus request metrics

pub mod jwt_auth;
pub mod metrics;

pub use jwt_auth::{AccountLookup, AccountStatus, AuthError, JwtAuthMiddleware, UserId};
pub use metrics::MetricsMiddleware;
