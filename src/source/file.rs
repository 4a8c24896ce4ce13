//! JSON file backend.

use async_trait::async_trait;
use serde::Deserialize;

use super::SourceAdapter;
use crate::config::FileSourceConfig;
use crate::error::SourceError;
use crate::tree::{FieldConvention, RawRecord};

#[derive(Debug, Default, Deserialize)]
struct FileSnapshot {
    #[serde(default)]
    channels: Vec<RawRecord>,
    #[serde(default)]
    clients: Vec<RawRecord>,
}

/// Reads `{"channels": [...], "clients": [...]}` from disk on every fetch.
pub struct FileSource {
    config: FileSourceConfig,
}

impl FileSource {
    pub fn new(config: FileSourceConfig) -> Self {
        Self { config }
    }

    async fn read(&self) -> Result<FileSnapshot, SourceError> {
        let bytes = tokio::fs::read(&self.config.path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl SourceAdapter for FileSource {
    fn name(&self) -> &'static str {
        "file"
    }

    fn convention(&self) -> FieldConvention {
        self.config.convention
    }

    async fn fetch_channels(&self) -> Result<Vec<RawRecord>, SourceError> {
        Ok(self.read().await?.channels)
    }

    async fn fetch_clients(&self) -> Result<Vec<RawRecord>, SourceError> {
        Ok(self.read().await?.clients)
    }
}
