use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::geo::{DatasetKey, FeatureCollection};

/// Lifecycle of one dataset in the cache.
///
/// `NotStarted → InFlight → Loaded | Failed`. `Loaded` is final for the
/// cache's lifetime; `Failed` only leaves on an explicit retry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CacheStatus {
    NotStarted,
    InFlight,
    Loaded,
    Failed,
}

impl CacheStatus {
    /// `Loaded` and `Failed` no longer change on their own.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Loaded | Self::Failed)
    }
}

/// What every consumer of a dataset key observes.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub status: CacheStatus,
    pub data: Option<Arc<FeatureCollection>>,
    pub error_message: Option<String>,
}

impl CacheEntry {
    pub fn not_started() -> Self {
        Self {
            status: CacheStatus::NotStarted,
            data: None,
            error_message: None,
        }
    }

    pub fn in_flight() -> Self {
        Self {
            status: CacheStatus::InFlight,
            data: None,
            error_message: None,
        }
    }

    pub fn loaded(data: Arc<FeatureCollection>) -> Self {
        Self {
            status: CacheStatus::Loaded,
            data: Some(data),
            error_message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: CacheStatus::Failed,
            data: None,
            error_message: Some(message.into()),
        }
    }
}

impl Default for CacheEntry {
    fn default() -> Self {
        Self::not_started()
    }
}

/// Wire summary of a cache entry, without the features themselves.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatasetState {
    pub key: DatasetKey,
    pub status: CacheStatus,
    #[serde(default)]
    pub feature_count: Option<usize>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl DatasetState {
    pub fn from_entry(key: DatasetKey, entry: &CacheEntry) -> Self {
        Self {
            key,
            status: entry.status,
            feature_count: entry.data.as_ref().map(|data| data.len()),
            error_message: entry.error_message.clone(),
        }
    }
}
