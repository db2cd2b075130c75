//! Crate-level error types for the entity runtime and the event logs.

/// Boxed error produced by serializer closures.
///
/// The registry contract is payload-format agnostic, so serializers report
/// failures through a type-erased error rather than committing the core to
/// one codec's error type.
pub type CodecError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error returned by [`EntityStore`](crate::EntityStore) operations.
#[derive(Debug, thiserror::Error)]
pub enum EntityError {
    /// No serializer is registered for an event kind.
    ///
    /// This is a wiring bug — the aggregate's registry is missing an entry —
    /// and must propagate to the caller, never be retried. `event_type` is
    /// the stored type name during replay, or the Rust event type name when
    /// an outgoing event has no matching entry.
    #[error("no serializer registered for event type '{event_type}' on aggregate '{aggregate}'")]
    NoSerializer {
        /// The aggregate type the lookup was performed for.
        aggregate: &'static str,
        /// The event type name that had no registry entry.
        event_type: String,
    },

    /// An event payload could not be serialized or deserialized.
    ///
    /// Replay cannot proceed partially past a record it cannot decode, so
    /// this aborts the operation that encountered it.
    #[error("failed to encode or decode event '{event_type}': {source}")]
    Codec {
        /// The event type name of the offending record.
        event_type: String,
        /// The underlying codec failure.
        #[source]
        source: CodecError,
    },

    /// The underlying event log failed.
    #[error(transparent)]
    Log(#[from] LogError),
}

/// Error returned by [`EventLog`](crate::EventLog) implementations.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    /// Disk I/O failure while reading or appending a stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A log file frame failed its integrity checks (bad magic, truncated
    /// record, or non-zero footer). The read of that stream is aborted
    /// rather than returning a silently-wrong record.
    #[error("corrupt event log frame in stream '{stream}': {detail}")]
    Corrupt {
        /// The stream whose file could not be read.
        stream: String,
        /// What failed the integrity check.
        detail: &'static str,
    },
}

/// A cached entity was read past its expiry.
///
/// Observably distinct from a cache miss for diagnostics, but the remedy is
/// identical: replay the stream. The runtime handles this internally and
/// callers of [`EntityStore::get_entity`](crate::EntityStore::get_entity)
/// never see it.
#[derive(Debug, thiserror::Error)]
#[error("cached entity has passed its expiry")]
pub struct EntityExpired;
