//! Fetching boundary datasets over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use thiserror::Error;

use super::DatasetRegistry;
use crate::models::{DatasetKey, FeatureCollection};

/// Default base URL of the boundary file host.
pub const DEFAULT_GEO_URL: &str = "http://localhost:8080/geo";

/// Upper bound on one dataset fetch, connect to last byte.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors fetching a dataset. Only ever surfaced as an entry's error message.
#[derive(Debug, Error)]
pub enum GeoError {
    #[error("Unknown dataset: {0}")]
    UnknownDataset(DatasetKey),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("Invalid feature collection: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Something that can produce a dataset's feature collection.
#[async_trait]
pub trait GeoSource: Send + Sync + 'static {
    async fn fetch(&self, key: &DatasetKey) -> Result<FeatureCollection, GeoError>;
}

/// Fetches datasets with a plain GET below a base URL.
#[derive(Debug, Clone)]
pub struct HttpGeoSource {
    base_url: String,
    registry: DatasetRegistry,
    client: Client,
}

impl HttpGeoSource {
    pub fn new(base_url: impl Into<String>, registry: DatasetRegistry) -> Result<Self, GeoError> {
        Self::with_timeout(base_url, registry, DEFAULT_FETCH_TIMEOUT)
    }

    /// A source whose fetches fail with [`GeoError::Http`] after `timeout`.
    ///
    /// An upstream that never answers must not leave an entry in flight forever.
    pub fn with_timeout(
        base_url: impl Into<String>,
        registry: DatasetRegistry,
        timeout: Duration,
    ) -> Result<Self, GeoError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into(),
            registry,
            client,
        })
    }

    /// Full URL of a dataset, or `None` if it is not registered.
    pub fn url_for(&self, key: &DatasetKey) -> Option<String> {
        self.registry.path(key).map(|path| {
            format!(
                "{}/{}",
                self.base_url.trim_end_matches('/'),
                path.trim_start_matches('/')
            )
        })
    }
}

#[async_trait]
impl GeoSource for HttpGeoSource {
    async fn fetch(&self, key: &DatasetKey) -> Result<FeatureCollection, GeoError> {
        let url = self
            .url_for(key)
            .ok_or_else(|| GeoError::UnknownDataset(key.clone()))?;

        tracing::debug!(dataset = %key, url = %url, "Fetching dataset");
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(GeoError::Status { status, body });
        }

        // Parse from bytes so a bad document reports as a parse error, not an HTTP one.
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
