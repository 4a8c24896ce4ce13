//! Fake ServerQuery SSH server.
//!
//! Accepts password logins for a fixed user and runs the fake ServerQuery
//! session handler on every shell channel.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use russh::server::{self, Auth, Msg, Session};
use russh::{Channel, ChannelId};
use russh_keys::key::KeyPair;
use tokio::net::TcpListener;
use tokio::task::{JoinHandle, JoinSet};
use tsviewd::config::SshConfig;

use super::serverquery::{PASSWORD, Shared, handle_session};

pub const USERNAME: &str = "serveradmin";

struct FakeHandler {
    shared: Arc<Shared>,
    channels: HashMap<ChannelId, Channel<Msg>>,
}

#[async_trait]
impl server::Handler for FakeHandler {
    type Error = russh::Error;

    async fn auth_password(&mut self, user: &str, password: &str) -> Result<Auth, Self::Error> {
        if user == USERNAME && password == PASSWORD {
            Ok(Auth::Accept)
        } else {
            Ok(Auth::Reject {
                proceed_with_methods: None,
            })
        }
    }

    async fn channel_open_session(
        &mut self,
        channel: Channel<Msg>,
        _session: &mut Session,
    ) -> Result<bool, Self::Error> {
        self.channels.insert(channel.id(), channel);
        Ok(true)
    }

    async fn shell_request(
        &mut self,
        channel: ChannelId,
        _session: &mut Session,
    ) -> Result<(), Self::Error> {
        if let Some(channel) = self.channels.remove(&channel) {
            tokio::spawn(handle_session(channel.into_stream(), Arc::clone(&self.shared)));
        }
        Ok(())
    }
}

/// A running fake SSH query server. Dropping it stops the server.
pub struct FakeSshQuery {
    addr: SocketAddr,
    shared: Arc<Shared>,
    handle: JoinHandle<()>,
}

#[allow(dead_code)]
impl FakeSshQuery {
    pub async fn spawn() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake SSH query");
        let addr = listener.local_addr().expect("No local address");
        let shared = Arc::new(Shared::default());
        let config = Arc::new(server::Config {
            keys: vec![KeyPair::generate_ed25519().expect("Failed to generate host key")],
            auth_rejection_time: Duration::from_millis(10),
            ..Default::default()
        });

        let handle = {
            let shared = Arc::clone(&shared);
            tokio::spawn(async move {
                let mut sessions = JoinSet::new();
                while let Ok((stream, _)) = listener.accept().await {
                    shared.connections.fetch_add(1, Ordering::SeqCst);
                    let handler = FakeHandler {
                        shared: Arc::clone(&shared),
                        channels: HashMap::new(),
                    };
                    let config = Arc::clone(&config);
                    sessions.spawn(async move {
                        if let Ok(running) = server::run_stream(config, stream, handler).await {
                            let _ = running.await;
                        }
                    });
                }
            })
        };

        Self {
            addr,
            shared,
            handle,
        }
    }

    /// Reply to `command` with `body`; see [`super::FakeServerQuery::reply`].
    pub fn reply(&self, command: &str, body: &str) {
        self.shared.reply(command, body);
    }

    pub fn config(&self) -> SshConfig {
        SshConfig {
            host: self.addr.ip().to_string(),
            port: self.addr.port(),
            username: USERNAME.to_string(),
            password: PASSWORD.to_string(),
            timeout_ms: 5_000,
            ..SshConfig::default()
        }
    }

    /// Every command line received so far, across connections.
    pub fn commands(&self) -> Vec<String> {
        self.shared.commands()
    }

    pub fn connections(&self) -> usize {
        self.shared.connections.load(Ordering::SeqCst)
    }
}

impl Drop for FakeSshQuery {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
