//! Raw record normalization.
//!
//! Source adapters hand over loosely typed records whose field names depend
//! on where they came from. Each [`FieldConvention`] maps those names onto
//! the canonical [`ChannelRecord`] and [`ClientRecord`] shapes so the builder
//! never looks at raw field names.
//!
//! Malformed records (missing or unusable id) are dropped silently.

use serde::Deserialize;
use serde_json::Value;
use tracing::trace;

use super::{ClientId, OrderToken, REGULAR_CLIENT, ROOT_ID};

/// A flat record as produced by a source adapter.
pub type RawRecord = serde_json::Map<String, Value>;

/// Field naming used by a source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldConvention {
    /// `id`, `parentId`, `order`, `name` / `id`, `channelId`, `nickname`, `type`.
    Friendly,
    /// ServerQuery short codes: `cid`, `pid`, `channel_order`, `channel_name` /
    /// `clid`, `cid`, `client_nickname`, `client_type`.
    Query,
    /// Friendly names first, query names as fallback, per field.
    #[default]
    Auto,
}

struct ChannelFields {
    id: &'static str,
    parent: &'static str,
    order: &'static str,
    name: &'static str,
}

struct ClientFields {
    id: &'static str,
    channel: &'static str,
    nickname: &'static str,
    kind: &'static str,
}

const FRIENDLY_CHANNEL: ChannelFields = ChannelFields {
    id: "id",
    parent: "parentId",
    order: "order",
    name: "name",
};

const QUERY_CHANNEL: ChannelFields = ChannelFields {
    id: "cid",
    parent: "pid",
    order: "channel_order",
    name: "channel_name",
};

const FRIENDLY_CLIENT: ClientFields = ClientFields {
    id: "id",
    channel: "channelId",
    nickname: "nickname",
    kind: "type",
};

const QUERY_CLIENT: ClientFields = ClientFields {
    id: "clid",
    channel: "cid",
    nickname: "client_nickname",
    kind: "client_type",
};

impl FieldConvention {
    fn channel_fields(self) -> &'static [ChannelFields] {
        match self {
            Self::Friendly => &[FRIENDLY_CHANNEL],
            Self::Query => &[QUERY_CHANNEL],
            Self::Auto => &[FRIENDLY_CHANNEL, QUERY_CHANNEL],
        }
    }

    fn client_fields(self) -> &'static [ClientFields] {
        match self {
            Self::Friendly => &[FRIENDLY_CLIENT],
            Self::Query => &[QUERY_CLIENT],
            Self::Auto => &[FRIENDLY_CLIENT, QUERY_CLIENT],
        }
    }
}

/// A channel in canonical shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRecord {
    /// Always non-zero.
    pub id: u64,
    /// `0` for top-level channels.
    pub parent_id: u64,
    pub name: String,
    pub order: OrderToken,
}

/// A client in canonical shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientRecord {
    pub id: ClientId,
    /// Channel the client sits in, if the source reported a usable one.
    pub channel_id: Option<u64>,
    pub nickname: String,
    /// Client type discriminator.
    pub kind: Option<i64>,
}

impl ClientRecord {
    /// Whether this is a regular user (not a query, bot or service session).
    #[inline]
    pub fn is_regular(&self) -> bool {
        self.kind == Some(REGULAR_CLIENT)
    }
}

/// Normalize a batch of raw channel records, dropping malformed ones.
pub fn channels(convention: FieldConvention, records: &[RawRecord]) -> Vec<ChannelRecord> {
    let normalized: Vec<_> = records
        .iter()
        .filter_map(|record| channel(convention, record))
        .collect();
    if normalized.len() != records.len() {
        trace!(
            dropped = records.len() - normalized.len(),
            "Dropped malformed channel records"
        );
    }
    normalized
}

/// Normalize a batch of raw client records, dropping malformed ones.
pub fn clients(convention: FieldConvention, records: &[RawRecord]) -> Vec<ClientRecord> {
    let normalized: Vec<_> = records
        .iter()
        .filter_map(|record| client(convention, record))
        .collect();
    if normalized.len() != records.len() {
        trace!(
            dropped = records.len() - normalized.len(),
            "Dropped malformed client records"
        );
    }
    normalized
}

/// Normalize one channel record. Returns `None` when the id is missing,
/// unparsable or not positive.
pub fn channel(convention: FieldConvention, record: &RawRecord) -> Option<ChannelRecord> {
    let fields = convention.channel_fields();

    let id = lookup(record, fields, |f| f.id)
        .and_then(as_integer)
        .and_then(positive)?;
    let parent_id = lookup(record, fields, |f| f.parent)
        .and_then(as_integer)
        .and_then(positive)
        .unwrap_or(ROOT_ID);
    let name = lookup(record, fields, |f| f.name)
        .and_then(as_text)
        .unwrap_or_default();
    let order = lookup(record, fields, |f| f.order)
        .and_then(as_order)
        .unwrap_or_else(|| OrderToken::from(0));

    Some(ChannelRecord {
        id,
        parent_id,
        name,
        order,
    })
}

/// Normalize one client record. Returns `None` when the id is missing.
pub fn client(convention: FieldConvention, record: &RawRecord) -> Option<ClientRecord> {
    let fields = convention.client_fields();

    let id = lookup(record, fields, |f| f.id).and_then(as_client_id)?;
    let channel_id = lookup(record, fields, |f| f.channel)
        .and_then(as_integer)
        .and_then(positive);
    let nickname = lookup(record, fields, |f| f.nickname)
        .and_then(as_text)
        .unwrap_or_default();
    let kind = lookup(record, fields, |f| f.kind).and_then(as_integer);

    Some(ClientRecord {
        id,
        channel_id,
        nickname,
        kind,
    })
}

/// First non-null value among the candidate field names.
fn lookup<'a, F>(
    record: &'a RawRecord,
    candidates: &[F],
    key: impl Fn(&F) -> &'static str,
) -> Option<&'a Value> {
    candidates
        .iter()
        .filter_map(|fields| record.get(key(fields)))
        .find(|value| !value.is_null())
}

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn positive(value: i64) -> Option<u64> {
    u64::try_from(value).ok().filter(|v| *v != 0)
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Integral tokens are stored in canonical form, so `1`, `"1"` and `1.0`
/// all name channel 1.
fn as_order(value: &Value) -> Option<OrderToken> {
    match as_integer(value) {
        Some(token) => Some(OrderToken::new(token.to_string())),
        None => as_text(value).map(OrderToken::new),
    }
}

fn as_client_id(value: &Value) -> Option<ClientId> {
    match value {
        Value::Number(n) => Some(
            n.as_u64()
                .or_else(|| as_integer(value).and_then(|id| u64::try_from(id).ok()))
                .map(ClientId::Numeric)
                .unwrap_or_else(|| ClientId::Opaque(n.to_string())),
        ),
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(
            s.trim()
                .parse()
                .map(ClientId::Numeric)
                .unwrap_or_else(|_| ClientId::Opaque(s.clone())),
        ),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawRecord {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {}", other),
        }
    }

    #[test]
    fn friendly_channel() {
        let record = raw(json!({"id": 4, "parentId": 1, "order": 2, "name": "Gaming"}));
        let channel = channel(FieldConvention::Friendly, &record).unwrap();
        assert_eq!(channel.id, 4);
        assert_eq!(channel.parent_id, 1);
        assert_eq!(channel.name, "Gaming");
        assert_eq!(channel.order, OrderToken::from("2"));
    }

    #[test]
    fn query_channel_from_strings() {
        let record = raw(json!({
            "cid": "12", "pid": "0", "channel_order": "11", "channel_name": "AFK"
        }));
        let channel = channel(FieldConvention::Query, &record).unwrap();
        assert_eq!(channel.id, 12);
        assert_eq!(channel.parent_id, ROOT_ID);
        assert_eq!(channel.order.value(), Some(11));
    }

    #[test]
    fn convention_is_strict_unless_auto() {
        let record = raw(json!({"cid": "3", "channel_name": "x"}));
        assert!(channel(FieldConvention::Friendly, &record).is_none());
        assert_eq!(channel(FieldConvention::Auto, &record).unwrap().id, 3);
    }

    #[test]
    fn auto_prefers_friendly_but_skips_null() {
        let record = raw(json!({"id": null, "cid": 9, "name": "n", "channel_name": "q"}));
        let channel = channel(FieldConvention::Auto, &record).unwrap();
        assert_eq!(channel.id, 9);
        assert_eq!(channel.name, "n");
    }

    #[test]
    fn malformed_channel_ids_are_dropped() {
        let records = vec![
            raw(json!({"id": "abc"})),
            raw(json!({"name": "no id"})),
            raw(json!({"id": 0})),
            raw(json!({"id": -3})),
            raw(json!({"id": 2.5})),
            raw(json!({"id": 7})),
        ];
        let normalized = channels(FieldConvention::Friendly, &records);
        assert_eq!(normalized.len(), 1);
        assert_eq!(normalized[0].id, 7);
    }

    #[test]
    fn bad_parent_references_become_root() {
        for parent in [json!(null), json!(0), json!("zero"), json!(-1), json!({})] {
            let record = raw(json!({"id": 5, "parentId": parent}));
            assert_eq!(
                channel(FieldConvention::Friendly, &record).unwrap().parent_id,
                ROOT_ID
            );
        }
    }

    #[test]
    fn missing_order_and_name_default() {
        let record = raw(json!({"id": 5}));
        let channel = channel(FieldConvention::Friendly, &record).unwrap();
        assert_eq!(channel.order.value(), Some(0));
        assert_eq!(channel.name, "");
    }

    #[test]
    fn integral_order_tokens_are_canonical() {
        for order in [json!(1), json!("1"), json!(1.0), json!(" 1 ")] {
            let record = raw(json!({"id": 2, "order": order}));
            let channel = channel(FieldConvention::Friendly, &record).unwrap();
            assert_eq!(channel.order, OrderToken::from("1"));
        }

        let record = raw(json!({"id": 2, "order": 1.5}));
        let channel = channel(FieldConvention::Friendly, &record).unwrap();
        assert_eq!(channel.order, OrderToken::from("1.5"));
        assert_eq!(channel.order.value(), None);
    }

    #[test]
    fn query_client() {
        let record = raw(json!({
            "clid": "8", "cid": "3", "client_nickname": "alice", "client_type": "0"
        }));
        let client = client(FieldConvention::Query, &record).unwrap();
        assert_eq!(client.id, ClientId::Numeric(8));
        assert_eq!(client.channel_id, Some(3));
        assert_eq!(client.nickname, "alice");
        assert!(client.is_regular());
    }

    #[test]
    fn client_kind_other_than_zero_is_not_regular() {
        let record = raw(json!({"id": 1, "channelId": 2, "nickname": "bot", "type": 1}));
        assert!(!client(FieldConvention::Friendly, &record).unwrap().is_regular());

        let record = raw(json!({"id": 1, "channelId": 2, "nickname": "x"}));
        assert!(!client(FieldConvention::Friendly, &record).unwrap().is_regular());
    }

    #[test]
    fn non_numeric_client_id_passes_through() {
        let record = raw(json!({"id": "abc=", "channelId": 2, "type": 0}));
        assert_eq!(
            client(FieldConvention::Friendly, &record).unwrap().id,
            ClientId::Opaque("abc=".to_string())
        );
    }

    #[test]
    fn numeric_client_ids_are_never_dropped() {
        let id_of = |id: Value| {
            let record = raw(json!({"id": id, "channelId": 1, "type": 0}));
            client(FieldConvention::Friendly, &record).unwrap().id
        };
        assert_eq!(id_of(json!(7.0)), ClientId::Numeric(7));
        assert_eq!(id_of(json!(-4)), ClientId::Opaque("-4".to_string()));
        assert_eq!(id_of(json!(2.5)), ClientId::Opaque("2.5".to_string()));
        assert_eq!(id_of(json!("-4")), ClientId::Opaque("-4".to_string()));
        assert_eq!(id_of(json!(u64::MAX)), ClientId::Numeric(u64::MAX));
    }

    #[test]
    fn client_without_id_is_dropped() {
        let records = vec![
            raw(json!({"channelId": 2, "type": 0})),
            raw(json!({"id": "", "channelId": 2, "type": 0})),
        ];
        assert!(clients(FieldConvention::Friendly, &records).is_empty());
    }

    #[test]
    fn convention_deserializes_lowercase() {
        let convention: FieldConvention = serde_json::from_value(json!("query")).unwrap();
        assert_eq!(convention, FieldConvention::Query);
    }
}
