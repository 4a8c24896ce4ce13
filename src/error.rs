//! Unified error handling for tsviewd.
//!
//! Upstream failures are collected in [`SourceError`]. They never reach HTTP
//! callers: the snapshot cache logs them, labels them for metrics and falls
//! back to stale or empty data.

use std::time::Duration;

use thiserror::Error;
use tsquery_proto::{ProtocolError, QueryStatus};

// ============================================================================
// Source Errors (upstream fetches)
// ============================================================================

/// Errors raised by a source adapter while fetching records.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("{command} rejected: {status}")]
    Query {
        command: String,
        status: QueryStatus,
    },

    #[error("ssh error: {0}")]
    Ssh(#[from] russh::Error),

    #[error("ssh authentication rejected for user {0}")]
    SshAuthRejected(String),

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {0}")]
    HttpStatus(u16),

    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("fetch task failed: {0}")]
    Task(String),
}

impl SourceError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Connect { .. } => "connect",
            Self::Protocol(_) => "protocol",
            Self::Query { .. } => "query",
            Self::Ssh(_) => "ssh",
            Self::SshAuthRejected(_) => "ssh_auth",
            Self::Http(_) => "http",
            Self::HttpStatus(_) => "http_status",
            Self::Decode(_) => "decode",
            Self::Io(_) => "io",
            Self::Timeout(_) => "timeout",
            Self::Task(_) => "task",
        }
    }

    /// Whether the underlying session is unusable after this error.
    ///
    /// A rejected command leaves a ServerQuery session intact; everything
    /// else means the connection has to be rebuilt.
    #[inline]
    pub fn is_transport(&self) -> bool {
        !matches!(self, Self::Query { .. })
    }
}
