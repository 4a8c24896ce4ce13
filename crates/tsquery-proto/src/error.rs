//! Error types for the ServerQuery protocol library.

use thiserror::Error;

/// Convenience type alias for Results using [`ProtocolError`].
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// Top-level protocol errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// I/O error during reading or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid UTF-8 bytes in a response line.
    #[error("invalid UTF-8 in line at byte {byte_pos}")]
    InvalidUtf8 {
        /// Byte position where UTF-8 validation failed.
        byte_pos: usize,
    },

    /// Line exceeded maximum allowed length.
    #[error("line too long: {actual} bytes (limit: {limit})")]
    LineTooLong {
        /// Actual line length.
        actual: usize,
        /// Maximum allowed length.
        limit: usize,
    },

    /// The peer did not greet with the ServerQuery banner.
    #[error("not a ServerQuery endpoint, greeting was {0:?}")]
    UnexpectedGreeting(String),

    /// A status line could not be parsed.
    #[error("malformed status line: {0}")]
    MalformedStatus(String),

    /// The connection closed before a complete reply was read.
    #[error("connection closed")]
    ConnectionClosed,
}
