//! Boundary datasets: where they come from and how they are cached.
//!
//! - [`DatasetRegistry`]: which dataset keys exist and their paths
//! - [`GeoSource`] / [`HttpGeoSource`]: fetch one dataset
//! - [`GeoDataCache`]: fetch each dataset at most once and share the result

mod cache;
mod datasets;
mod source;

pub use cache::{CacheStats, GeoDataCache, Subscription};
pub use datasets::DatasetRegistry;
pub use source::{GeoError, GeoSource, HttpGeoSource, DEFAULT_FETCH_TIMEOUT, DEFAULT_GEO_URL};
