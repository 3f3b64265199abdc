//! Domain models for the waste monitoring dashboard.
//!
//! # Core Concepts
//!
//! - [`Session`]: authentication state read by the access guard. Owned by the
//!   identity provider, never mutated by consumers.
//! - [`FeatureCollection`]: a boundary dataset (kelurahan, RT, ...) as parsed
//!   from GeoJSON. Immutable once loaded.
//! - [`CacheEntry`]: the shared per-dataset state every consumer observes.

mod cache;
mod geo;
mod session;

pub use cache::*;
pub use geo::*;
pub use session::*;
