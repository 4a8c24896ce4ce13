//! ServerQuery session handling and the TCP backend.
//!
//! A [`Session`] speaks the line protocol over any byte stream; the TCP
//! backend here and the SSH backend in [`super::ssh`] differ only in how the
//! stream is opened and whether `login` is needed.
//!
//! One session is opened lazily and reused across fetches. Commands on a
//! session are strictly request/response, so the session sits behind an
//! async mutex. Any transport failure drops the session and the next command
//! reconnects; a command that fails on a reused session is retried once on a
//! fresh one, since idle sessions are closed by the server.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::codec::Framed;
use tracing::{debug, info, trace};
use tsquery_proto::{
    Command, GREETING_BANNER, ProtocolError, QueryCodec, QueryFrame, Record, parse_records,
};

use super::{SourceAdapter, into_raw};
use crate::config::ServerQueryConfig;
use crate::error::SourceError;
use crate::tree::{FieldConvention, RawRecord};

/// Byte stream a session runs over.
pub(crate) trait QueryStream: AsyncRead + AsyncWrite + Send {}

impl<T: AsyncRead + AsyncWrite + Send> QueryStream for T {}

/// A ServerQuery connection with a virtual server selected.
pub(crate) struct Session {
    framed: Framed<Pin<Box<dyn QueryStream>>, QueryCodec>,
    /// Whatever carries the stream and must outlive it (the SSH client).
    _link: Option<Box<dyn Send>>,
}

impl Session {
    /// Check the greeting on `stream`, send `login` when credentials are
    /// given, then select virtual server `sid`.
    pub(crate) async fn establish<S: QueryStream + 'static>(
        stream: S,
        link: Option<Box<dyn Send>>,
        login: Option<(&str, &str)>,
        sid: u32,
    ) -> Result<Self, SourceError> {
        let stream: Pin<Box<dyn QueryStream>> = Box::pin(stream);
        let mut session = Self {
            framed: Framed::new(stream, QueryCodec::new()),
            _link: link,
        };
        match session.framed.next().await {
            Some(Ok(QueryFrame::Data(line))) if line == GREETING_BANNER => {}
            Some(Ok(frame)) => {
                return Err(ProtocolError::UnexpectedGreeting(format!("{:?}", frame)).into());
            }
            Some(Err(e)) => return Err(e.into()),
            None => return Err(ProtocolError::ConnectionClosed.into()),
        }

        // The welcome text that follows the banner is collected (and
        // discarded) as part of the first reply.
        if let Some((username, password)) = login {
            session.execute(Command::login(username, password)).await?;
        }
        session.execute(Command::use_virtual_server(sid)).await?;
        Ok(session)
    }

    /// Send `command` and collect its records up to the closing status line.
    async fn execute(&mut self, command: Command) -> Result<Vec<Record>, SourceError> {
        let name = command.name().to_string();
        self.framed.send(command).await?;

        let mut records = Vec::new();
        while let Some(frame) = self.framed.next().await {
            match frame? {
                QueryFrame::Data(line) => records.extend(parse_records(&line)),
                QueryFrame::Notify(line) => trace!(event = %line, "Ignoring ServerQuery event"),
                QueryFrame::Status(status) if status.is_ok() => return Ok(records),
                QueryFrame::Status(status) if status.is_empty_result() => return Ok(Vec::new()),
                QueryFrame::Status(status) => {
                    return Err(SourceError::Query {
                        command: name,
                        status,
                    });
                }
            }
        }
        Err(ProtocolError::ConnectionClosed.into())
    }

    async fn quit(mut self) {
        if let Err(e) = self.execute(Command::quit()).await {
            debug!(error = %e, "ServerQuery quit failed");
        }
    }
}

/// Opens a fresh [`Session`].
#[async_trait]
pub(crate) trait Connect: Send + Sync {
    async fn connect(&self) -> Result<Session, SourceError>;
}

#[async_trait]
impl Connect for ServerQueryConfig {
    async fn connect(&self) -> Result<Session, SourceError> {
        let addr = format!("{}:{}", self.host, self.port);
        let stream = TcpStream::connect(&addr)
            .await
            .map_err(|source| SourceError::Connect {
                addr: addr.clone(),
                source,
            })?;
        stream.set_nodelay(true)?;

        let login = Some((self.username.as_str(), self.password.as_str()));
        let session = Session::establish(stream, None, login, self.virtual_server).await?;
        info!(addr = %addr, sid = self.virtual_server, "ServerQuery session established");
        Ok(session)
    }
}

/// The reusable session of one backend.
pub(crate) struct SessionSlot {
    session: Mutex<Option<Session>>,
    timeout: Duration,
}

impl SessionSlot {
    pub(crate) fn new(timeout: Duration) -> Self {
        Self {
            session: Mutex::new(None),
            timeout,
        }
    }

    pub(crate) async fn query(
        &self,
        connector: &impl Connect,
        command: Command,
    ) -> Result<Vec<Record>, SourceError> {
        let mut slot = self.session.lock().await;
        let reused = slot.is_some();

        match self.attempt(&mut slot, connector, command.clone()).await {
            Err(e) if reused && e.is_transport() => {
                debug!(error = %e, command = command.name(), "Reused session failed, reconnecting");
                self.attempt(&mut slot, connector, command).await
            }
            result => result,
        }
    }

    /// Run one command under the timeout. The session is taken out of
    /// `slot` for the duration and only put back if it is still usable, so a
    /// timeout or transport error leaves `slot` empty.
    async fn attempt(
        &self,
        slot: &mut Option<Session>,
        connector: &impl Connect,
        command: Command,
    ) -> Result<Vec<Record>, SourceError> {
        let run = async {
            let mut session = match slot.take() {
                Some(session) => session,
                None => connector.connect().await?,
            };
            let result = session.execute(command).await;
            match &result {
                Err(e) if e.is_transport() => {}
                _ => *slot = Some(session),
            }
            result
        };
        tokio::time::timeout(self.timeout, run)
            .await
            .unwrap_or(Err(SourceError::Timeout(self.timeout)))
    }

    /// Send `quit` on the open session, if any, and drop it.
    pub(crate) async fn close(&self) {
        let session = self.session.lock().await.take();
        if let Some(session) = session
            && tokio::time::timeout(self.timeout, session.quit()).await.is_err()
        {
            debug!("ServerQuery quit timed out");
        }
    }
}

/// Reads channel and client lists over a ServerQuery TCP session.
pub struct ServerQuerySource {
    config: ServerQueryConfig,
    session: SessionSlot,
}

impl ServerQuerySource {
    pub fn new(config: ServerQueryConfig) -> Self {
        Self {
            session: SessionSlot::new(config.timeout()),
            config,
        }
    }
}

#[async_trait]
impl SourceAdapter for ServerQuerySource {
    fn name(&self) -> &'static str {
        "serverquery"
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
