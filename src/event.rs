//! Aggregate identity, stream naming, and the stored event record.
//!
//! These are the foundational types shared by the event logs, the caches,
//! and the entity runtime. No I/O occurs here.

use std::fmt;
use std::time::SystemTime;

use uuid::Uuid;

/// The key of an aggregate instance.
///
/// An aggregate kind declares exactly one key kind by construction: its
/// [`new`](crate::Aggregate::new) constructor accepts the variant it expects
/// and its [`id`](crate::Aggregate::id) accessor always returns that same
/// variant. The textual form (via [`Display`](fmt::Display)) is what appears
/// in stream names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AggregateId {
    /// A UUID key (hyphenated textual form).
    Uuid(Uuid),
    /// A 64-bit integer key.
    Int(i64),
    /// A string key, used verbatim.
    Str(String),
}

impl fmt::Display for AggregateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregateId::Uuid(id) => write!(f, "{id}"),
            AggregateId::Int(id) => write!(f, "{id}"),
            AggregateId::Str(id) => f.write_str(id),
        }
    }
}

impl From<Uuid> for AggregateId {
    fn from(id: Uuid) -> Self {
        AggregateId::Uuid(id)
    }
}

impl From<i64> for AggregateId {
    fn from(id: i64) -> Self {
        AggregateId::Int(id)
    }
}

impl From<String> for AggregateId {
    fn from(id: String) -> Self {
        AggregateId::Str(id)
    }
}

impl From<&str> for AggregateId {
    fn from(id: &str) -> Self {
        AggregateId::Str(id.to_owned())
    }
}

/// Version sentinel for an aggregate with no events applied.
///
/// Distinct from version `0`, which is the version of the first stored
/// event. A freshly constructed aggregate whose stream is empty carries
/// this sentinel in the cache.
pub const NEW_VERSION: i64 = -1;

/// Derive the stream name for an aggregate instance.
///
/// Stream identity is `"{aggregate_type}_{id}"` and is stable for the
/// lifetime of the aggregate instance. Stream names are never reused
/// across aggregate kinds because the type name is part of the identity.
///
/// # Examples
///
/// ```
/// use entityfold::{AggregateId, stream_name};
/// assert_eq!(stream_name("person", &AggregateId::Int(7)), "person_7");
/// ```
pub fn stream_name(aggregate_type: &str, id: &AggregateId) -> String {
    format!("{aggregate_type}_{id}")
}

/// The current wall-clock time as Unix epoch milliseconds.
pub(crate) fn now_unix_millis() -> i64 {
    SystemTime::UNIX_EPOCH
        .elapsed()
        .expect("system clock is before Unix epoch")
        .as_millis() as i64
}

/// One stored event record within a stream.
///
/// Within a stream, records are totally ordered by `version`, starting at 0
/// and increasing by exactly 1 with no gaps. The runtime assigns versions;
/// the log stores what it is given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventContainer {
    /// Stable event-type name as registered with the serializer registry.
    /// Not necessarily the Rust type name.
    pub event_type: String,
    /// Zero-based version this event creates within its stream.
    pub version: i64,
    /// Serialized event payload. JSON in the reference configuration, but
    /// the log is payload-format agnostic.
    pub payload: Vec<u8>,
    /// Time the event was recorded, Unix epoch milliseconds.
    pub timestamp: i64,
}

impl EventContainer {
    /// Construct a record stamped with the current time.
    pub fn new(event_type: impl Into<String>, version: i64, payload: Vec<u8>) -> Self {
        Self {
            event_type: event_type.into(),
            version,
            payload,
            timestamp: now_unix_millis(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_name_uses_type_and_id() {
        let id = AggregateId::Str("abc".into());
        assert_eq!(stream_name("person", &id), "person_abc");
    }

    #[test]
    fn stream_name_is_deterministic_for_uuid_keys() {
        let uuid = Uuid::new_v4();
        let a = stream_name("person", &AggregateId::Uuid(uuid));
        let b = stream_name("person", &AggregateId::Uuid(uuid));
        assert_eq!(a, b, "same inputs must produce the same stream name");
    }

    #[test]
    fn stream_names_differ_by_aggregate_type() {
        let id = AggregateId::Int(1);
        assert_ne!(stream_name("person", &id), stream_name("order", &id));
    }

    #[test]
    fn display_formats_each_key_kind() {
        assert_eq!(AggregateId::Int(42).to_string(), "42");
        assert_eq!(AggregateId::Str("x-1".into()).to_string(), "x-1");
        let uuid = Uuid::new_v4();
        assert_eq!(AggregateId::Uuid(uuid).to_string(), uuid.to_string());
    }

    #[test]
    fn container_new_stamps_current_time() {
        let before = now_unix_millis();
        let container = EventContainer::new("Created", 0, b"{}".to_vec());
        let after = now_unix_millis();
        assert!(container.timestamp >= before && container.timestamp <= after);
        assert_eq!(container.event_type, "Created");
        assert_eq!(container.version, 0);
    }
}
