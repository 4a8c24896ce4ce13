//! Fake ServerQuery server.
//!
//! Speaks just enough of the line protocol for the adapter: greeting,
//! `login` (checked against a fixed password), `use`, `quit`, and canned
//! replies for list commands. The same session handler serves the SSH fake.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::task::{JoinHandle, JoinSet};
use tsviewd::config::ServerQueryConfig;

pub const PASSWORD: &str = "test-password";

const GREETING: &str = "TS3\n\rWelcome to the TeamSpeak 3 ServerQuery interface, type \"help\" for a list of commands.\n\r";
const OK: &str = "error id=0 msg=ok\n\r";
const BAD_LOGIN: &str = "error id=520 msg=invalid\\sloginname\\sor\\spassword\n\r";
const EMPTY_RESULT: &str = "error id=1281 msg=database\\sempty\\sresult\\sset\n\r";

#[derive(Default)]
pub(super) struct Shared {
    replies: Mutex<HashMap<String, String>>,
    commands: Mutex<Vec<String>>,
    pub(super) connections: AtomicUsize,
}

impl Shared {
    pub(super) fn reply(&self, command: &str, body: &str) {
        self.replies
            .lock()
            .insert(command.to_string(), body.to_string());
    }

    pub(super) fn commands(&self) -> Vec<String> {
        self.commands.lock().clone()
    }
}

/// A running fake server. Dropping it stops the server and closes every
/// open connection.
pub struct FakeServerQuery {
    addr: SocketAddr,
    shared: Arc<Shared>,
    handle: JoinHandle<()>,
}

#[allow(dead_code)]
impl FakeServerQuery {
    pub async fn spawn() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake ServerQuery");
        let addr = listener.local_addr().expect("No local address");
        let shared = Arc::new(Shared::default());

        let handle = {
            let shared = Arc::clone(&shared);
            tokio::spawn(async move {
                let mut sessions = JoinSet::new();
                while let Ok((stream, _)) = listener.accept().await {
                    shared.connections.fetch_add(1, Ordering::SeqCst);
                    sessions.spawn(handle_session(stream, Arc::clone(&shared)));
                }
            })
        };

        Self {
            addr,
            shared,
            handle,
        }
    }

    /// Reply to `command` with `body` (records, without the status line).
    /// An empty body answers with the empty-result status instead.
    pub fn reply(&self, command: &str, body: &str) {
        self.shared.reply(command, body);
    }

    pub fn config(&self) -> ServerQueryConfig {
        ServerQueryConfig {
            host: self.addr.ip().to_string(),
            port: self.addr.port(),
            password: PASSWORD.to_string(),
            timeout_ms: 2_000,
            ..ServerQueryConfig::default()
        }
    }

    /// Every command line received so far, across connections.
    pub fn commands(&self) -> Vec<String> {
        self.shared.commands()
    }

    pub fn connections(&self) -> usize {
        self.shared.connections.load(Ordering::SeqCst)
    }

    /// Stop accepting and close every open session.
    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for FakeServerQuery {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub(super) async fn handle_session<S>(stream: S, shared: Arc<Shared>)
where
    S: AsyncRead + AsyncWrite + Send,
{
    let (read, mut write) = tokio::io::split(stream);
    if write.write_all(GREETING.as_bytes()).await.is_err() {
        return;
    }

    let mut lines = BufReader::new(read).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        shared.commands.lock().push(line.clone());
        let name = line.split(' ').next().unwrap_or_default().to_string();

        let response = match name.as_str() {
            "login" if !line.ends_with(&format!("client_login_password={}", PASSWORD)) => {
                BAD_LOGIN.to_string()
            }
            "quit" => {
                let _ = write.write_all(OK.as_bytes()).await;
                return;
            }
            _ => {
                let body = shared.replies.lock().get(&name).cloned();
                match body {
                    Some(body) if body.is_empty() => EMPTY_RESULT.to_string(),
                    // Events may arrive ahead of any reply.
                    Some(body) => {
                        format!("notifyclientmoved ctid=2 reasonid=0 clid=5\n\r{body}\n\r{OK}")
                    }
                    None => OK.to_string(),
                }
            }
        };
        if write.write_all(response.as_bytes()).await.is_err() {
            return;
        }
    }
}
