//! ServerQuery response parsing.
//!
//! A reply to a command is zero or more data lines followed by exactly one
//! status line:
//!
//! ```text
//! cid=1 pid=0 channel_order=0 channel_name=Lobby|cid=2 pid=0 channel_order=1 channel_name=AFK
//! error id=0 msg=ok
//! ```
//!
//! Records within a data line are separated by `|`, fields by a space.
//! A field without `=` is a flag with an empty value.

use std::collections::BTreeMap;

use crate::error::{ProtocolError, Result};
use crate::escape::unescape;

/// One flat record of unescaped `key -> value` pairs.
pub type Record = BTreeMap<String, String>;

/// Parse one data line into its records.
///
/// Empty segments (e.g. a trailing `|`) produce no record.
pub fn parse_records(line: &str) -> Vec<Record> {
    line.trim_end_matches(['\r', '\n'])
        .split('|')
        .map(parse_fields)
        .filter(|record| !record.is_empty())
        .collect()
}

fn parse_fields(segment: &str) -> Record {
    segment
        .split(' ')
        .filter(|field| !field.is_empty())
        .map(|field| match field.split_once('=') {
            Some((key, value)) => (key.to_string(), unescape(value).into_owned()),
            None => (field.to_string(), String::new()),
        })
        .collect()
}

/// Status id the server returns for a list command with nothing to list.
pub const EMPTY_RESULT_SET: u32 = 1281;

/// The status line terminating every reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryStatus {
    /// Error id; `0` means success.
    pub id: u32,
    /// Human-readable message (`ok` on success).
    pub message: String,
    /// Optional extra detail sent by some errors.
    pub extra: Option<String>,
}

impl QueryStatus {
    /// Whether the line starts like a status line.
    #[inline]
    pub fn is_status_line(line: &str) -> bool {
        line == "error" || line.starts_with("error ")
    }

    /// Parse `error id=<n> msg=<text> [extra_msg=<text>]`.
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        let rest = line
            .strip_prefix("error")
            .ok_or_else(|| ProtocolError::MalformedStatus(line.to_string()))?;
        let fields = parse_fields(rest);

        let id = fields
            .get("id")
            .and_then(|id| id.parse::<u32>().ok())
            .ok_or_else(|| ProtocolError::MalformedStatus(line.to_string()))?;

        Ok(Self {
            id,
            message: fields.get("msg").cloned().unwrap_or_default(),
            extra: fields.get("extra_msg").cloned(),
        })
    }

    /// Whether the command succeeded.
    #[inline]
    pub fn is_ok(&self) -> bool {
        self.id == 0
    }

    /// Whether the command succeeded but matched nothing.
    #[inline]
    pub fn is_empty_result(&self) -> bool {
        self.id == EMPTY_RESULT_SET
    }
}

impl std::fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "error {}: {}", self.id, self.message)?;
        if let Some(extra) = &self.extra {
            write!(f, " ({})", extra)?;
        }
        Ok(())
    }
}
