//! HTTP client for the BiteBurst API.
//!
//! Used by the `status` and `path` CLI commands. Configuration is via
//! environment variables:
//! - `BITEBURST_URL` - Base URL (default: `http://127.0.0.1:3000/api/v1`)
//! - `BITEBURST_API_KEY` - API key for authentication (optional for local)

use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::api::ErrorBody;
use crate::models::*;

/// Default URL for local development.
pub const DEFAULT_URL: &str = "http://127.0.0.1:3000/api/v1";

/// HTTP client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: API key required or invalid")]
    Unauthorized,

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Invalid base URL: {0}")]
    InvalidUrl(String),
}

#[derive(Debug, Clone)]
pub struct BiteBurstClient {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl BiteBurstClient {
    pub fn from_env() -> Self {
        let base_url = std::env::var("BITEBURST_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
        let api_key = std::env::var("BITEBURST_API_KEY").ok();
        Self::new(base_url, api_key)
    }

    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            client: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a request for `base_url` followed by `segments`. Each segment is
    /// percent-encoded, so ids may contain `/`, `?` or `#`.
    fn request(
        &self,
        method: Method,
        segments: &[&str],
    ) -> Result<reqwest::RequestBuilder, ClientError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(segments);

        let mut req = self.client.request(method, url);
        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key);
        }
        Ok(req)
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body = response.text().await.unwrap_or_default();
        // Prefer the server's message over the raw JSON body
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|e| e.message)
            .unwrap_or(body);
        match status {
            StatusCode::NOT_FOUND => Err(ClientError::NotFound(message)),
            StatusCode::BAD_REQUEST | StatusCode::CONFLICT => Err(ClientError::BadRequest(message)),
            StatusCode::UNAUTHORIZED => Err(ClientError::Unauthorized),
            StatusCode::SERVICE_UNAVAILABLE => Err(ClientError::Unavailable(message)),
            _ => Err(ClientError::Server(format!("{}: {}", status, message))),
        }
    }

    /// `true` when the server answers its health check.
    pub async fn health(&self) -> Result<bool, ClientError> {
        let response = self.request(Method::GET, &["health"])?.send().await?;
        let body: serde_json::Value = self.handle_response(response).await?;
        Ok(body.get("status").and_then(|s| s.as_str()) == Some("ok"))
    }

    pub async fn progress(&self, child_id: &str) -> Result<ChildProgress, ClientError> {
        let response = self
            .request(Method::GET, &["children", child_id, "progress"])?
            .send()
            .await?;
        self.handle_response(response).await
    }

    pub async fn path(&self, child_id: &str) -> Result<PathView, ClientError> {
        let response = self
            .request(Method::GET, &["children", child_id, "path"])?
            .send()
            .await?;
        self.handle_response(response).await
    }

    pub async fn lessons(&self) -> Result<Vec<LessonDefinition>, ClientError> {
        let response = self.request(Method::GET, &["catalog", "lessons"])?.send().await?;
        self.handle_response(response).await
    }

    pub async fn complete_lesson(
        &self,
        child_id: &str,
        lesson_id: &str,
    ) -> Result<LessonCompletion, ClientError> {
        let response = self
            .request(
                Method::POST,
                &["children", child_id, "lessons", lesson_id, "complete"],
            )?
            .send()
            .await?;
        self.handle_response(response).await
    }
}
