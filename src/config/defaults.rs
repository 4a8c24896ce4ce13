//! Default value functions for configuration.
//!
//! Separated into its own module for clarity and reuse.

use std::net::SocketAddr;

/// Returns `true` (for serde defaults).
pub fn default_true() -> bool {
    true
}

// =============================================================================
// HTTP Defaults
// =============================================================================

pub fn default_http_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3000))
}

// =============================================================================
// Cache Defaults
// =============================================================================

pub fn default_cache_ttl_ms() -> u64 {
    60_000
}

// =============================================================================
// Source Defaults
// =============================================================================

pub fn default_query_host() -> String {
    "services".to_string()
}

pub fn default_query_port() -> u16 {
    tsquery_proto::DEFAULT_QUERY_PORT
}

pub fn default_ssh_port() -> u16 {
    tsquery_proto::DEFAULT_SSH_QUERY_PORT
}

pub fn default_query_username() -> String {
    "serveradmin".to_string()
}

pub fn default_webquery_url() -> String {
    "http://services:10080".to_string()
}

pub fn default_virtual_server() -> u32 {
    1
}

pub fn default_source_timeout_ms() -> u64 {
    10_000
}
