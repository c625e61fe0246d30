//! HTTP client for the messenger API.

use crate::error::{ApiError, ApiResult};
use crate::models::{SendRequest, ServerMessage};
use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

#[async_trait]
pub trait MessageApi: Send + Sync {
    /// `POST /messages/{chat_id}`
    async fn send_message(&self, chat_id: i64, request: &SendRequest<'_>) -> ApiResult<ServerMessage>;

    /// `GET /messages/{chat_id}`
    async fn fetch_messages(&self, chat_id: i64) -> ApiResult<Vec<ServerMessage>>;

    /// `GET /auth/verify`; used as the connectivity probe.
    async fn verify_session(&self) -> ApiResult<()>;

    fn is_authenticated(&self) -> bool;
}

#[derive(Deserialize)]
struct MessageEnvelope {
    message: ServerMessage,
}

#[derive(Deserialize)]
struct MessagesEnvelope {
    messages: Vec<ServerMessage>,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

pub struct HttpMessageApi {
    client: Client,
    base_url: String,
    token: RwLock<Option<String>>,
}

impl HttpMessageApi {
    pub fn new(base_url: &str, timeout: Duration) -> ApiResult<Self> {
        let base_url = base_url.trim_end_matches('/');
        reqwest::Url::parse(base_url).map_err(|e| ApiError::InvalidUrl(format!("{base_url}: {e}")))?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.to_string(),
            token: RwLock::new(None),
        })
    }

    pub fn set_token(&self, token: impl Into<String>) {
        *self.token.write() = Some(token.into());
    }

    pub fn clear_token(&self) {
        *self.token.write() = None;
    }

    fn bearer(&self) -> ApiResult<String> {
        self.token
            .read()
            .as_ref()
            .map(|t| format!("Bearer {t}"))
            .ok_or(ApiError::Unauthenticated)
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
        let status = response.status();
        if status.is_success() {
            return response.json::<T>().await.map_err(|e| ApiError::Decode(e.to_string()));
        }

        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body
                .message
                .or(body.error)
                .unwrap_or_else(|| status.to_string()),
            Err(_) => status.to_string(),
        };
        Err(ApiError::Status {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl MessageApi for HttpMessageApi {
    async fn send_message(&self, chat_id: i64, request: &SendRequest<'_>) -> ApiResult<ServerMessage> {
        let url = format!("{}/messages/{}", self.base_url, chat_id);
        debug!(chat_id, client_message_id = %request.client_message_id, "sending message");

        let response = self
            .client
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, self.bearer()?)
            .json(request)
            .send()
            .await?;

        Self::parse::<MessageEnvelope>(response)
            .await
            .map(|body| body.message)
    }

    async fn fetch_messages(&self, chat_id: i64) -> ApiResult<Vec<ServerMessage>> {
        let url = format!("{}/messages/{}", self.base_url, chat_id);
        let response = self
            .client
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, self.bearer()?)
            .send()
            .await?;

        Self::parse::<MessagesEnvelope>(response)
            .await
            .map(|body| body.messages)
    }

    async fn verify_session(&self) -> ApiResult<()> {
        let url = format!("{}/auth/verify", self.base_url);
        let response = self
            .client
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, self.bearer()?)
            .send()
            .await?;

        Self::parse::<serde_json::Value>(response).await.map(|_| ())
    }

    fn is_authenticated(&self) -> bool {
        self.token.read().is_some()
    }
}
