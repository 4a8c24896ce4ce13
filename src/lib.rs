//! tsviewd - TeamSpeak channel tree snapshot service.
//!
//! Reads the flat channel and client lists from a TeamSpeak server, rebuilds
//! the nested channel tree in display order, and serves it over HTTP from a
//! TTL snapshot cache.

pub mod config;
pub mod error;
pub mod http;
pub mod metrics;
pub mod snapshot;
pub mod source;
pub mod telemetry;
pub mod tree;

pub use error::SourceError;
pub use snapshot::{CacheStatus, SnapshotCache};
pub use source::SourceAdapter;
