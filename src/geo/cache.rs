//! Lazy, deduplicated cache of boundary datasets.
//!
//! Each dataset key owns one `watch` channel holding its [`CacheEntry`]. The
//! first request for a key flips it from `NotStarted` to `InFlight` and spawns
//! the only fetch that key will ever see (barring an explicit
//! [`GeoDataCache::retry`]); every other consumer subscribes to the same
//! channel and observes the outcome.
//!
//! ```text
//! map view A ─┐
//!             │                                   GeoSource
//! map view B ─┼──► GeoDataCache ──(first only)──► fetch(key)
//!             │        │                              │
//! status API ─┘        ▼                              ▼
//!               watch<CacheEntry> ◄──── Loaded(Arc) | Failed(msg)
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::GeoSource;
use crate::models::{CacheEntry, CacheStatus, DatasetKey};

/// Counters for monitoring how well requests are deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Every `request` and `retry` call
    pub total_requests: u64,
    /// Fetches actually started
    pub fetches_started: u64,
    /// Requests that joined a fetch already in flight
    pub coalesced_requests: u64,
    /// Requests answered from a loaded entry
    pub cache_hits: u64,
    /// Explicit retries of failed entries
    pub retries: u64,
}

impl CacheStats {
    /// Share of requests that did not start a fetch (0.0 to 1.0).
    pub fn dedup_ratio(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            (self.total_requests - self.fetches_started) as f64 / self.total_requests as f64
        }
    }
}

type Slot = Arc<watch::Sender<CacheEntry>>;

#[derive(Default)]
struct CacheState {
    slots: HashMap<DatasetKey, Slot>,
    stats: CacheStats,
}

/// Shared cache of boundary datasets.
///
/// Owned by the application state and handed to consumers; dropping it tears
/// down every entry. Fetch tasks already running finish on their own.
pub struct GeoDataCache {
    source: Arc<dyn GeoSource>,
    state: Mutex<CacheState>,
}

impl GeoDataCache {
    pub fn new(source: Arc<dyn GeoSource>) -> Self {
        Self {
            source,
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Ask for a dataset, starting its fetch if nobody has yet.
    ///
    /// Never starts a second fetch for a key that is in flight, loaded or
    /// failed. Must be called from within a Tokio runtime.
    pub fn request(&self, key: &DatasetKey) -> Subscription {
        let mut state = self.state.lock();
        state.stats.total_requests += 1;

        let slot = Self::slot(&mut state, key);
        let status = slot.borrow().status;

        match status {
            CacheStatus::NotStarted => {
                // Flip to InFlight before releasing the lock; concurrent callers see it.
                slot.send_replace(CacheEntry::in_flight());
                state.stats.fetches_started += 1;
                debug!(dataset = %key, "Starting dataset fetch");
                self.spawn_fetch(key.clone(), Arc::clone(&slot));
            }
            CacheStatus::InFlight => {
                state.stats.coalesced_requests += 1;
                debug!(
                    dataset = %key,
                    coalesced = state.stats.coalesced_requests,
                    "Joining in-flight dataset fetch"
                );
            }
            CacheStatus::Loaded => {
                state.stats.cache_hits += 1;
            }
            CacheStatus::Failed => {
                debug!(dataset = %key, "Dataset previously failed, not refetching");
            }
        }

        Subscription::new(slot.subscribe())
    }

    /// Observe a dataset without triggering its fetch.
    pub fn subscribe(&self, key: &DatasetKey) -> Subscription {
        let mut state = self.state.lock();
        let slot = Self::slot(&mut state, key);
        Subscription::new(slot.subscribe())
    }

    /// Fetch a failed dataset once more.
    ///
    /// Only `Failed` entries are refetched; for any other status this behaves
    /// like [`request`](Self::request).
    pub fn retry(&self, key: &DatasetKey) -> Subscription {
        {
            let mut state = self.state.lock();
            let slot = Self::slot(&mut state, key);
            let failed = slot.borrow().status == CacheStatus::Failed;
            if failed {
                state.stats.total_requests += 1;
                state.stats.retries += 1;
                state.stats.fetches_started += 1;
                slot.send_replace(CacheEntry::in_flight());
                info!(dataset = %key, "Retrying failed dataset fetch");
                self.spawn_fetch(key.clone(), Arc::clone(&slot));
                return Subscription::new(slot.subscribe());
            }
        }
        self.request(key)
    }

    /// Current entry for a key. Unknown keys read as `NotStarted` and are not created.
    pub fn snapshot(&self, key: &DatasetKey) -> CacheEntry {
        self.state
            .lock()
            .slots
            .get(key)
            .map(|slot| slot.borrow().clone())
            .unwrap_or_default()
    }

    /// Every key the cache has seen, sorted, with its current entry.
    pub fn entries(&self) -> Vec<(DatasetKey, CacheEntry)> {
        let state = self.state.lock();
        let mut entries: Vec<_> = state
            .slots
            .iter()
            .map(|(key, slot)| (key.clone(), slot.borrow().clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    pub fn stats(&self) -> CacheStats {
        self.state.lock().stats.clone()
    }

    pub fn log_stats(&self) {
        let state = self.state.lock();
        info!(
            total_requests = state.stats.total_requests,
            fetches = state.stats.fetches_started,
            coalesced = state.stats.coalesced_requests,
            hits = state.stats.cache_hits,
            retries = state.stats.retries,
            datasets = state.slots.len(),
            dedup_ratio = format!("{:.1}%", state.stats.dedup_ratio() * 100.0),
            "Dataset cache statistics"
        );
    }

    fn slot(state: &mut CacheState, key: &DatasetKey) -> Slot {
        let slot = state.slots.entry(key.clone()).or_insert_with(|| {
            let (tx, _rx) = watch::channel(CacheEntry::not_started());
            Arc::new(tx)
        });
        Arc::clone(slot)
    }

    /// Run the fetch on its own task and record whatever it ends with.
    ///
    /// A panicking source settles the entry as `Failed` instead of leaving it in flight.
    fn spawn_fetch(&self, key: DatasetKey, slot: Slot) {
        let source = Arc::clone(&self.source);
        tokio::spawn(async move {
            let fetch_key = key.clone();
            let fetch = tokio::spawn(async move { source.fetch(&fetch_key).await });

            let entry = match fetch.await {
                Ok(Ok(collection)) => {
                    info!(dataset = %key, features = collection.len(), "Dataset loaded");
                    CacheEntry::loaded(Arc::new(collection))
                }
                Ok(Err(e)) => {
                    warn!(dataset = %key, error = %e, "Dataset fetch failed");
                    CacheEntry::failed(e.to_string())
                }
                Err(e) => {
                    error!(dataset = %key, error = %e, "Dataset fetch task aborted");
                    CacheEntry::failed(format!("Dataset fetch aborted: {}", e))
                }
            };
            // No receivers is fine: the slot keeps the value for later subscribers.
            slot.send_replace(entry);
        });
    }
}

/// A consumer's view of one dataset. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    rx: watch::Receiver<CacheEntry>,
}

impl Subscription {
    fn new(rx: watch::Receiver<CacheEntry>) -> Self {
        Self { rx }
    }

    /// The entry as it stands now.
    pub fn current(&self) -> CacheEntry {
        self.rx.borrow().clone()
    }

    /// Wait for the next state change. `None` once the cache is gone.
    pub async fn changed(&mut self) -> Option<CacheEntry> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Wait until the entry is `Loaded` or `Failed`.
    ///
    /// Returns the last known entry if the cache is dropped first.
    pub async fn settled(&mut self) -> CacheEntry {
        loop {
            let entry = self.rx.borrow_and_update().clone();
            if entry.status.is_settled() {
                return entry;
            }
            if self.rx.changed().await.is_err() {
                return self.rx.borrow().clone();
            }
        }
    }
}
