//! Upstream source configuration.
//!
//! The `backend` key of the `[source]` table picks the adapter; the other
//! keys belong to that adapter.
//!
//! Without a `[source]` table the service reads ServerQuery over SSH, the
//! only transport the query port of current servers accepts by default.
//!
//! ```toml
//! [source]
//! backend = "webquery"
//! base_url = "http://ts.example.net:10080"
//! api_key = "BAD..."
//! ```

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use super::defaults::{
    default_query_host, default_query_port, default_query_username, default_source_timeout_ms,
    default_ssh_port, default_virtual_server, default_webquery_url,
};
use crate::tree::FieldConvention;

/// Which upstream to read the channel tree from.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum SourceConfig {
    /// ServerQuery over an SSH shell channel.
    Ssh(SshConfig),
    /// Raw ServerQuery over TCP.
    ServerQuery(ServerQueryConfig),
    /// HTTP WebQuery API.
    WebQuery(WebQueryConfig),
    /// JSON document on disk.
    File(FileSourceConfig),
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self::Ssh(SshConfig::default())
    }
}

impl SourceConfig {
    /// Backend name as written in the config file.
    pub fn backend(&self) -> &'static str {
        match self {
            Self::Ssh(_) => "ssh",
            Self::ServerQuery(_) => "serverquery",
            Self::WebQuery(_) => "webquery",
            Self::File(_) => "file",
        }
    }
}

/// ServerQuery (TCP) connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerQueryConfig {
    #[serde(default = "default_query_host")]
    pub host: String,
    #[serde(default = "default_query_port")]
    pub port: u16,
    #[serde(default = "default_query_username")]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Virtual server id selected with `use sid=..` after login.
    #[serde(default = "default_virtual_server")]
    pub virtual_server: u32,
    /// Connect and per-command timeout in milliseconds.
    #[serde(default = "default_source_timeout_ms")]
    pub timeout_ms: u64,
}

impl ServerQueryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ServerQueryConfig {
    fn default() -> Self {
        Self {
            host: default_query_host(),
            port: default_query_port(),
            username: default_query_username(),
            password: String::new(),
            virtual_server: default_virtual_server(),
            timeout_ms: default_source_timeout_ms(),
        }
    }
}

/// ServerQuery over SSH settings. The SSH login replaces the `login`
/// command.
#[derive(Debug, Clone, Deserialize)]
pub struct SshConfig {
    #[serde(default = "default_query_host")]
    pub host: String,
    #[serde(default = "default_ssh_port")]
    pub port: u16,
    #[serde(default = "default_query_username")]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_virtual_server")]
    pub virtual_server: u32,
    /// Expected SHA-256 host key fingerprint (base64, optional `SHA256:`
    /// prefix). Any host key is accepted when unset.
    #[serde(default)]
    pub host_key_fingerprint: Option<String>,
    /// Connect and per-command timeout in milliseconds.
    #[serde(default = "default_source_timeout_ms")]
    pub timeout_ms: u64,
}

impl SshConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            host: default_query_host(),
            port: default_ssh_port(),
            username: default_query_username(),
            password: String::new(),
            virtual_server: default_virtual_server(),
            host_key_fingerprint: None,
            timeout_ms: default_source_timeout_ms(),
        }
    }
}

/// WebQuery (HTTP) settings.
#[derive(Debug, Clone, Deserialize)]
pub struct WebQueryConfig {
    /// Base URL without the virtual server segment.
    #[serde(default = "default_webquery_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_virtual_server")]
    pub virtual_server: u32,
    /// Request timeout in milliseconds.
    #[serde(default = "default_source_timeout_ms")]
    pub timeout_ms: u64,
}

impl WebQueryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// JSON file settings.
#[derive(Debug, Clone, Deserialize)]
pub struct FileSourceConfig {
    /// Path to a `{"channels": [...], "clients": [...]}` document.
    pub path: PathBuf,
    /// Field naming used inside the document.
    #[serde(default)]
    pub convention: FieldConvention,
}
