//! The pluggable event log contract.

use async_trait::async_trait;

use crate::error::LogError;
use crate::event::EventContainer;

/// An append-only, per-stream ordered event log.
///
/// Streams are addressed by name (see [`stream_name`](crate::stream_name)).
/// Implementations must return records in ascending version order and treat
/// a never-written stream as empty, not as an error.
///
/// The log does **not** enforce optimistic-concurrency conflict detection:
/// the caller computes the version to write. Two writers racing on the same
/// stream can both succeed with the same version; callers needing strict
/// per-stream serialization must serialize appends externally.
///
/// Built-in implementations: [`MemoryEventLog`](crate::MemoryEventLog)
/// (testing/ephemeral) and [`FileEventLog`](crate::FileEventLog) (one binary
/// file per stream). An adapter to an external managed event store plugs in
/// at this same seam.
#[async_trait]
pub trait EventLog: Send + Sync {
    /// Read every record of a stream, ascending by version.
    ///
    /// # Returns
    ///
    /// The full, finite record sequence; empty if the stream never existed.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::Io`] for storage failures and
    /// [`LogError::Corrupt`] when a stored frame fails integrity checks,
    /// in which case no partial prefix is returned.
    async fn read_stream(&self, stream: &str) -> Result<Vec<EventContainer>, LogError>;

    /// Append one record to a stream.
    ///
    /// # Arguments
    ///
    /// * `stream` - Stream name to append to.
    /// * `event_type` - Stable event-type name from the serializer registry.
    /// * `version` - The version this record creates, computed by the caller.
    /// * `payload` - The serialized event payload.
    ///
    /// # Returns
    ///
    /// The version written.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::Io`] if persisting the record fails.
    async fn append_to_stream(
        &self,
        stream: &str,
        event_type: &str,
        version: i64,
        payload: Vec<u8>,
    ) -> Result<i64, LogError>;
}
