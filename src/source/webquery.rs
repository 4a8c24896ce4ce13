//! WebQuery (HTTP) backend.
//!
//! `GET {base_url}/{sid}/channellist` and `/clientlist`, authenticated with
//! the `x-api-key` header. Replies are wrapped in an envelope:
//!
//! ```json
//! {"body": [{"cid": "1", ...}], "status": {"code": 0, "message": "ok"}}
//! ```

use async_trait::async_trait;
use serde::Deserialize;
use tsquery_proto::{EMPTY_RESULT_SET, QueryStatus};

use super::SourceAdapter;
use crate::config::WebQueryConfig;
use crate::error::SourceError;
use crate::tree::{FieldConvention, RawRecord};

const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    body: Option<Vec<RawRecord>>,
    status: EnvelopeStatus,
}

#[derive(Debug, Deserialize)]
struct EnvelopeStatus {
    code: u32,
    #[serde(default)]
    message: String,
    #[serde(default)]
    extra_message: Option<String>,
}

/// Reads channel and client lists from the WebQuery HTTP API.
pub struct WebQuerySource {
    config: WebQueryConfig,
    http_client: reqwest::Client,
}

impl WebQuerySource {
    pub fn new(config: WebQueryConfig) -> Result<Self, SourceError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("tsviewd/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            config,
            http_client,
        })
    }

    fn url(&self, command: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.virtual_server,
            command
        )
    }

    async fn get(&self, command: &str) -> Result<Vec<RawRecord>, SourceError> {
        let response = self
            .http_client
            .get(self.url(command))
            .header(API_KEY_HEADER, &self.config.api_key)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SourceError::Timeout(self.config.timeout())
                } else {
                    SourceError::Http(e)
                }
            })?;

        let http_status = response.status();
        let bytes = response.bytes().await?;

        // WebQuery reports command errors in the envelope, sometimes with a
        // non-2xx status, so the body is read first.
        let envelope: Envelope = match serde_json::from_slice(&bytes) {
            Ok(envelope) => envelope,
            Err(_) if !http_status.is_success() => {
                return Err(SourceError::HttpStatus(http_status.as_u16()));
            }
            Err(e) => return Err(e.into()),
        };

        match envelope.status.code {
            0 => Ok(envelope.body.unwrap_or_default()),
            EMPTY_RESULT_SET => Ok(Vec::new()),
            id => Err(SourceError::Query {
                command: command.to_string(),
                status: QueryStatus {
                    id,
                    message: envelope.status.message,
                    extra: envelope.status.extra_message,
                },
            }),
        }
    }
}

#[async_trait]
impl SourceAdapter for WebQuerySource {
    fn name(&self) -> &'static str {
        "webquery"
    }

    fn convention(&self) -> FieldConvention {
        FieldConvention::Query
    }

    async fn fetch_channels(&self) -> Result<Vec<RawRecord>, SourceError> {
        self.get("channellist").await
    }

    async fn fetch_clients(&self) -> Result<Vec<RawRecord>, SourceError> {
        self.get("clientlist").await
    }
}
