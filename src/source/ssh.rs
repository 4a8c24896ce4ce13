//! ServerQuery over SSH.
//!
//! Current servers only accept SSH on the query port by default. The SSH
//! login authenticates the query client, so the session skips `login` and
//! starts with `use`; everything after that is the plain line protocol on the
//! shell channel.

use std::sync::Arc;

use async_trait::async_trait;
use russh::client;
use russh_keys::key::PublicKey;
use tracing::{debug, info, warn};
use tsquery_proto::Command;

use super::serverquery::{Connect, Session, SessionSlot};
use super::{SourceAdapter, into_raw};
use crate::config::SshConfig;
use crate::error::SourceError;
use crate::tree::{FieldConvention, RawRecord};

/// Host key policy: pinned fingerprint when configured, otherwise accept.
struct HostKeyCheck {
    fingerprint: Option<String>,
}

#[async_trait]
impl client::Handler for HostKeyCheck {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        let presented = server_public_key.fingerprint();
        match &self.fingerprint {
            Some(expected) => {
                let matches = expected.trim().trim_start_matches("SHA256:") == presented;
                if !matches {
                    warn!(expected = %expected, presented = %presented, "SSH host key mismatch");
                }
                Ok(matches)
            }
            None => {
                debug!(fingerprint = %presented, "Accepting unpinned SSH host key");
                Ok(true)
            }
        }
    }
}

#[async_trait]
impl Connect for SshConfig {
    async fn connect(&self) -> Result<Session, SourceError> {
        let addr = format!("{}:{}", self.host, self.port);
        let handler = HostKeyCheck {
            fingerprint: self.host_key_fingerprint.clone(),
        };
        let mut handle = client::connect(
            Arc::new(client::Config::default()),
            (self.host.as_str(), self.port),
            handler,
        )
        .await?;

        let authenticated = handle
            .authenticate_password(self.username.clone(), self.password.clone())
            .await?;
        if !authenticated {
            return Err(SourceError::SshAuthRejected(self.username.clone()));
        }

        let mut channel = handle.channel_open_session().await?;
        channel.request_shell(true).await?;

        let session = Session::establish(
            channel.into_stream(),
            Some(Box::new(handle)),
            None,
            self.virtual_server,
        )
        .await?;
        info!(addr = %addr, sid = self.virtual_server, "ServerQuery SSH session established");
        Ok(session)
    }
}

/// Reads channel and client lists over a ServerQuery SSH session.
pub struct SshSource {
    config: SshConfig,
    session: SessionSlot,
}

impl SshSource {
    pub fn new(config: SshConfig) -> Self {
        Self {
            session: SessionSlot::new(config.timeout()),
            config,
        }
    }
}

#[async_trait]
impl SourceAdapter for SshSource {
    fn name(&self) -> &'static str {
        "ssh"
    }

    fn convention(&self) -> FieldConvention {
        FieldConvention::Query
    }

    async fn fetch_channels(&self) -> Result<Vec<RawRecord>, SourceError> {
        self.session
            .query(&self.config, Command::channel_list())
            .await
            .map(into_raw)
    }

    async fn fetch_clients(&self) -> Result<Vec<RawRecord>, SourceError> {
        self.session
            .query(&self.config, Command::client_list())
            .await
            .map(into_raw)
    }

    async fn close(&self) {
        self.session.close().await;
    }
}
