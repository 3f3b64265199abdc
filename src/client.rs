//! HTTP client for a running dashboard service.
//!
//! Used by `wastemon status`. Configuration is via environment variables:
//! - `WASTE_MONITOR_URL` - Base URL (default: `http://localhost:3000/api/v1`)
//! - `WASTE_MONITOR_TOKEN` - Session token (optional)

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::models::*;

/// Default URL for a local service.
pub const DEFAULT_URL: &str = "http://localhost:3000/api/v1";

/// HTTP client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: sign in first")]
    Unauthorized,

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Server error: {0}")]
    Server(String),
}

#[derive(Debug, Clone)]
pub struct DashboardClient {
    base_url: String,
    token: Option<String>,
    client: Client,
}

impl DashboardClient {
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("WASTE_MONITOR_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
        let token = std::env::var("WASTE_MONITOR_TOKEN").ok();
        Self::new(base_url, token)
    }

    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            client: Client::new(),
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.client.request(method, &url);
        if let Some(ref token) = self.token {
            req = req.bearer_auth(token);
        }
        req
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            Ok(response.json().await?)
        } else {
            let body = response.text().await.unwrap_or_default();
            match status {
                StatusCode::NOT_FOUND => Err(ClientError::NotFound(body)),
                StatusCode::UNAUTHORIZED => Err(ClientError::Unauthorized),
                StatusCode::SERVICE_UNAVAILABLE => Err(ClientError::Unavailable(body)),
                _ => Err(ClientError::Server(format!("{}: {}", status, body))),
            }
        }
    }

    /// Cache state of every registered dataset.
    pub async fn datasets(&self) -> Result<Vec<DatasetState>, ClientError> {
        let response = self.request(reqwest::Method::GET, "/datasets").send().await?;
        self.handle_response(response).await
    }
}
