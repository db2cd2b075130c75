//! Post-commit event fan-out.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;

use crate::event::AggregateId;

/// A committed event handed to the streamer, type-erased so one streamer
/// instance serves every aggregate kind.
///
/// Downcast `event` with the aggregate's `Event` enum type to recover the
/// concrete value.
#[derive(Debug, Clone)]
pub struct StreamedEvent {
    /// Id of the aggregate the event belongs to.
    pub key: AggregateId,
    /// The aggregate kind's stable type name.
    pub aggregate_type: &'static str,
    /// The event's stable type name from the serializer registry.
    pub event_type: &'static str,
    /// The committed event value.
    pub event: Arc<dyn Any + Send + Sync>,
}

/// Receives every event after it has been committed to the log.
///
/// Streaming is best-effort: the event is already durable when the streamer
/// runs, so a streamer failure is logged and swallowed rather than failing
/// the append. Implementations wanting delivery guarantees should enqueue
/// durably and retry internally.
#[async_trait]
pub trait EventStreamer: Send + Sync {
    /// Deliver one committed event.
    ///
    /// # Errors
    ///
    /// Any error is reported by the runtime as a warning and otherwise
    /// ignored.
    async fn stream_event(
        &self,
        event: StreamedEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}
