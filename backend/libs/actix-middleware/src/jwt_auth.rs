use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::StatusCode,
    Error, HttpMessage, HttpResponse, ResponseError,
};
use async_trait::async_trait;
use crypto_core::jwt::JwtValidator;
use error_types::{error_codes, error_types as kinds, ErrorResponse};
use futures::future::{ready, Ready};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;

/// User ID extracted from JWT
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserId(pub i64);

/// Account state checked after the token is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountStatus {
    Active,
    Banned,
    Missing,
}

/// Looks up whether a token's user may still use the API.
#[async_trait]
pub trait AccountLookup: Send + Sync {
    async fn account_status(&self, user_id: i64) -> Result<AccountStatus, String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    MissingToken,
    InvalidToken,
    UserNotFound,
    Banned,
    Lookup,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            AuthError::MissingToken => "Access token required",
            AuthError::InvalidToken => "Invalid token",
            AuthError::UserNotFound => "User not found",
            AuthError::Banned => "Account is banned",
            AuthError::Lookup => "Authentication failed",
        };
        f.write_str(msg)
    }
}

impl ResponseError for AuthError {
    fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingToken | AuthError::InvalidToken | AuthError::UserNotFound => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::Banned => StatusCode::FORBIDDEN,
            AuthError::Lookup => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let (error_type, code) = match self {
            AuthError::MissingToken => (kinds::AUTHENTICATION_ERROR, error_codes::TOKEN_MISSING),
            AuthError::InvalidToken => (kinds::AUTHENTICATION_ERROR, error_codes::TOKEN_INVALID),
            AuthError::UserNotFound => (kinds::AUTHENTICATION_ERROR, error_codes::USER_NOT_FOUND),
            AuthError::Banned => (kinds::AUTHORIZATION_ERROR, error_codes::USER_BANNED),
            AuthError::Lookup => (kinds::SERVER_ERROR, error_codes::INTERNAL_SERVER_ERROR),
        };
        let body = ErrorResponse::new(
            status.canonical_reason().unwrap_or("Error"),
            &self.to_string(),
            status.as_u16(),
            error_type,
            code,
        );
        HttpResponse::build(status).json(body)
    }
}

/// JWT Authentication Middleware
///
/// Accepts `Authorization: Bearer <token>`, validates it and stores [`UserId`] in
/// the request extensions. With an [`AccountLookup`] configured, unknown users are
/// rejected with 401 and banned users with 403.
#[derive(Clone)]
pub struct JwtAuthMiddleware {
    validator: Arc<JwtValidator>,
    accounts: Option<Arc<dyn AccountLookup>>,
}

impl JwtAuthMiddleware {
    pub fn new(validator: Arc<JwtValidator>) -> Self {
        Self {
            validator,
            accounts: None,
        }
    }

    pub fn with_account_lookup(mut self, accounts: Arc<dyn AccountLookup>) -> Self {
        self.accounts = Some(accounts);
        self
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtAuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = JwtAuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(JwtAuthMiddlewareService {
            service: Rc::new(service),
            validator: self.validator.clone(),
            accounts: self.accounts.clone(),
        }))
    }
}

pub struct JwtAuthMiddlewareService<S> {
    service: Rc<S>,
    validator: Arc<JwtValidator>,
    accounts: Option<Arc<dyn AccountLookup>>,
}

impl<S, B> Service<ServiceRequest> for JwtAuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let validator = self.validator.clone();
        let accounts = self.accounts.clone();

        Box::pin(async move {
            let token = req
                .headers()
                .get("Authorization")
                .and_then(|h| h.to_str().ok())
                .and_then(|h| h.strip_prefix("Bearer "))
                .filter(|t| !t.is_empty())
                .ok_or(AuthError::MissingToken)?;

            let claims = validator.validate(token).map_err(|e| {
                tracing::debug!(error = %e, "JWT validation failed");
                AuthError::InvalidToken
            })?;

            if let Some(accounts) = accounts {
                match accounts.account_status(claims.user_id).await {
                    Ok(AccountStatus::Active) => {}
                    Ok(AccountStatus::Missing) => return Err(AuthError::UserNotFound.into()),
                    Ok(AccountStatus::Banned) => {
                        tracing::info!(user_id = claims.user_id, "rejected banned user");
                        return Err(AuthError::Banned.into());
                    }
                    Err(e) => {
                        tracing::error!(user_id = claims.user_id, error = %e, "account lookup failed");
                        return Err(AuthError::Lookup.into());
                    }
                }
            }

            req.extensions_mut().insert(UserId(claims.user_id));

            service.call(req).await
        })
    }
}

/// FromRequest implementation for UserId
impl actix_web::FromRequest for UserId {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(
        req: &actix_web::HttpRequest,
        _payload: &mut actix_web::dev::Payload,
    ) -> Self::Future {
        match req.extensions().get::<UserId>() {
            Some(user_id) => ready(Ok(*user_id)),
            None => ready(Err(AuthError::MissingToken.into())),
        }
    }
}
