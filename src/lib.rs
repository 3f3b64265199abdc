//! Access-guarded dashboard service for municipal waste monitoring.
//!
//! - [`guard`]: role-gated access decisions and their HTTP enforcement
//! - [`geo`]: lazy, deduplicated loading of boundary datasets
//! - [`identity`]: the session store the guard reads
//! - [`api`]: the axum router tying them together

pub mod api;
pub mod client;
pub mod config;
pub mod geo;
pub mod guard;
pub mod identity;
pub mod models;
pub mod render;
