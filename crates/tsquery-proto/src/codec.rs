//! Line codec for the ServerQuery protocol.
//!
//! The server terminates lines with `\n\r` (in that order), so lines are
//! split on `\n` and any `\r` left at either end is discarded. Commands are
//! written with a single `\n`.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::command::Command;
use crate::error::{self, ProtocolError};
use crate::response::QueryStatus;

/// Default maximum line length. Channel lists of large servers are sent as a
/// single line, so this is far above a typical text protocol limit.
pub const DEFAULT_MAX_LINE_LEN: usize = 4 * 1024 * 1024;

/// A decoded line, classified by its leading token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryFrame {
    /// A data line (records, or the greeting banner).
    Data(String),
    /// The status line closing a reply.
    Status(QueryStatus),
    /// An asynchronous event line (`notify...`).
    Notify(String),
}

/// Tokio codec reading [`QueryFrame`]s and writing [`Command`]s.
pub struct QueryCodec {
    /// Index of next byte to check for newline
    next_index: usize,
    max_len: usize,
}

impl Default for QueryCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryCodec {
    /// Create a codec with the default line limit.
    pub fn new() -> Self {
        Self::with_max_len(DEFAULT_MAX_LINE_LEN)
    }

    /// Create a codec with a custom line limit.
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            next_index: 0,
            max_len,
        }
    }

    fn classify(line: String) -> error::Result<QueryFrame> {
        if QueryStatus::is_status_line(&line) {
            QueryStatus::parse(&line).map(QueryFrame::Status)
        } else if line.starts_with("notify") {
            Ok(QueryFrame::Notify(line))
        } else {
            Ok(QueryFrame::Data(line))
        }
    }
}

impl Decoder for QueryCodec {
    type Item = QueryFrame;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> error::Result<Option<QueryFrame>> {
        loop {
            let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') else {
                self.next_index = src.len();
                if src.len() > self.max_len {
                    return Err(ProtocolError::LineTooLong {
                        actual: src.len(),
                        limit: self.max_len,
                    });
                }
                return Ok(None);
            };

            let line = src.split_to(self.next_index + offset + 1);
            self.next_index = 0;

            if line.len() > self.max_len {
                return Err(ProtocolError::LineTooLong {
                    actual: line.len(),
                    limit: self.max_len,
                });
            }

            let text = std::str::from_utf8(&line).map_err(|e| ProtocolError::InvalidUtf8 {
                byte_pos: e.valid_up_to(),
            })?;
            let text = text.trim_matches(['\r', '\n']);

            // The `\r` of a `\n\r` terminator arrives ahead of the next line
            // and leaves an empty line behind when it is the last byte read.
            if text.is_empty() {
                continue;
            }

            return Self::classify(text.to_string()).map(Some);
        }
    }
}

impl Encoder<Command> for QueryCodec {
    type Error = ProtocolError;

    fn encode(&mut self, cmd: Command, dst: &mut BytesMut) -> error::Result<()> {
        let line = cmd.to_string();
        dst.reserve(line.len() + 1);
        dst.extend_from_slice(line.as_bytes());
        dst.extend_from_slice(b"\n");
        Ok(())
    }
}
