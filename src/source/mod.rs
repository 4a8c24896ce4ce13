//! Upstream source adapters.
//!
//! A [`SourceAdapter`] reads the flat channel and client lists from a
//! TeamSpeak server. The backend is chosen by configuration:
//!
//! - [`ssh`]: ServerQuery over an SSH shell channel
//! - [`serverquery`]: raw ServerQuery over TCP
//! - [`webquery`]: the HTTP WebQuery API
//! - [`file`]: a JSON document on disk

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::SourceConfig;
use crate::error::SourceError;
use crate::tree::{FieldConvention, RawRecord};

pub mod file;
pub mod serverquery;
pub mod ssh;
pub mod webquery;

pub use file::FileSource;
pub use serverquery::ServerQuerySource;
pub use ssh::SshSource;
pub use webquery::WebQuerySource;

#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Backend name used in logs and metric labels.
    fn name(&self) -> &'static str;

    /// Field naming of the records this adapter returns.
    fn convention(&self) -> FieldConvention;

    /// Read the flat channel list.
    async fn fetch_channels(&self) -> Result<Vec<RawRecord>, SourceError>;

    /// Read the flat list of connected clients.
    async fn fetch_clients(&self) -> Result<Vec<RawRecord>, SourceError>;

    /// End any open upstream session. Called once on shutdown.
    async fn close(&self) {}
}

/// Build the adapter selected by `config`.
pub fn from_config(config: &SourceConfig) -> Result<Arc<dyn SourceAdapter>, SourceError> {
    let source: Arc<dyn SourceAdapter> = match config {
        SourceConfig::Ssh(config) => Arc::new(SshSource::new(config.clone())),
        SourceConfig::ServerQuery(config) => Arc::new(ServerQuerySource::new(config.clone())),
        SourceConfig::WebQuery(config) => Arc::new(WebQuerySource::new(config.clone())?),
        SourceConfig::File(config) => Arc::new(FileSource::new(config.clone())),
    };
    Ok(source)
}

/// Convert ServerQuery records into raw records with string values.
pub(crate) fn into_raw(records: Vec<tsquery_proto::Record>) -> Vec<RawRecord> {
    records
        .into_iter()
        .map(|record| {
            record
                .into_iter()
                .map(|(key, value)| (key, serde_json::Value::String(value)))
                .collect()
        })
        .collect()
}
