//! Channel tree reconstruction.
//!
//! Turns the flat channel and client lists reported by a source adapter into
//! the nested, display-ordered tree the server shows its users.
//!
//! - [`normalize`]: raw records under a [`FieldConvention`] into canonical
//!   [`ChannelRecord`]/[`ClientRecord`]s
//! - [`order`]: sibling ordering from the linked-list `order` tokens
//! - [`build`](build()): grouping, cycle breaking and recursive assembly

mod build;
pub mod normalize;
pub mod order;

pub use build::{build, build_raw};
pub use normalize::{ChannelRecord, ClientRecord, FieldConvention, RawRecord};

use serde::{Serialize, Serializer};

/// Parent id of top-level channels (the synthetic root).
pub const ROOT_ID: u64 = 0;

/// Client type value of a regular connected user. Other values are
/// ServerQuery sessions, bots and similar service connections.
pub const REGULAR_CLIENT: i64 = 0;

/// A channel with its ordered subchannels and connected users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: u64,
    pub name: String,
    /// Raw sibling order token as reported by the server.
    pub order: OrderToken,
    pub parent_id: u64,
    pub subchannels: Vec<Channel>,
    pub clients: Vec<Client>,
}

/// A regular user connected to a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Client {
    pub id: ClientId,
    pub nickname: String,
}

/// Client identifier: numeric for every known source, passed through
/// verbatim otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum ClientId {
    Numeric(u64),
    Opaque(String),
}

/// Sibling position token.
///
/// `0` marks the first sibling; any other value is the id of the sibling
/// directly above. Integral tokens are stored in canonical form; anything
/// else keeps the text the server sent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderToken(String);

impl OrderToken {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Numeric value of the token. An empty token counts as `0`.
    pub fn value(&self) -> Option<i64> {
        let trimmed = self.0.trim();
        if trimmed.is_empty() {
            return Some(0);
        }
        trimmed.parse().ok()
    }
}

impl From<u64> for OrderToken {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl From<&str> for OrderToken {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl Serialize for OrderToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0.trim().parse::<i64>() {
            Ok(value) => serializer.serialize_i64(value),
            Err(_) => serializer.serialize_str(&self.0),
        }
    }
}

/// Size summary of a built tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TreeStats {
    pub channels: usize,
    pub clients: usize,
    /// Nesting depth; `0` for an empty tree, `1` when all channels are top-level.
    pub depth: usize,
}

/// Count channels, clients and nesting depth.
pub fn stats(tree: &[Channel]) -> TreeStats {
    let mut stats = TreeStats::default();
    for channel in tree {
        let sub = stats_of(channel);
        stats.channels += sub.channels;
        stats.clients += sub.clients;
        stats.depth = stats.depth.max(sub.depth);
    }
    stats
}

fn stats_of(channel: &Channel) -> TreeStats {
    let below = stats(&channel.subchannels);
    TreeStats {
        channels: below.channels + 1,
        clients: below.clients + channel.clients.len(),
        depth: below.depth + 1,
    }
}
