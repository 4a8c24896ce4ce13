//! # tsquery-proto
//!
//! Parsing and encoding for the TeamSpeak 3 ServerQuery line protocol.
//!
//! ## Features
//!
//! - Value escaping and unescaping
//! - Command construction with escaped `key=value` arguments and `-flag` options
//! - Response parsing into flat key/value records
//! - Status line (`error id=.. msg=..`) parsing
//! - Optional Tokio codec for framed I/O
//!
//! ## Quick Start
//!
//! ```rust
//! use tsquery_proto::{Command, parse_records};
//!
//! let login = Command::new("login")
//!     .arg("client_login_name", "serveradmin")
//!     .arg("client_login_password", "s3cret pass");
//! assert_eq!(
//!     login.to_string(),
//!     "login client_login_name=serveradmin client_login_password=s3cret\\spass"
//! );
//!
//! let records = parse_records("cid=1 pid=0 channel_name=Lobby|cid=2 pid=0 channel_name=AFK");
//! assert_eq!(records.len(), 2);
//! assert_eq!(records[1]["channel_name"], "AFK");
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

#[cfg(feature = "tokio")]
pub mod codec;
pub mod command;
pub mod error;
pub mod escape;
pub mod response;

#[cfg(feature = "tokio")]
pub use self::codec::{QueryCodec, QueryFrame};
pub use self::command::Command;
pub use self::error::ProtocolError;
pub use self::escape::{escape, unescape};
pub use self::response::{parse_records, QueryStatus, Record, EMPTY_RESULT_SET};

/// Default ServerQuery TCP port.
pub const DEFAULT_QUERY_PORT: u16 = 10011;

/// Default ServerQuery SSH port.
pub const DEFAULT_SSH_QUERY_PORT: u16 = 10022;

/// First line sent by a ServerQuery server after accepting a connection.
pub const GREETING_BANNER: &str = "TS3";
