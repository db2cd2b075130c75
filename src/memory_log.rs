//! In-memory event log for tests and ephemeral runs.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::LogError;
use crate::event::EventContainer;
use crate::log::EventLog;

/// An event log that holds streams in memory only.
///
/// Streams live in a dictionary keyed by stream name; nothing survives the
/// process. A single mutex guards the whole map, so at most one writer
/// mutates a stream at a time and readers always observe a consistent
/// prefix (reads clone the stream's records, making replay restartable).
#[derive(Debug, Default)]
pub struct MemoryEventLog {
    streams: Mutex<HashMap<String, Vec<EventContainer>>>,
}

impl MemoryEventLog {
    /// Create an empty in-memory log.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventLog for MemoryEventLog {
    async fn read_stream(&self, stream: &str) -> Result<Vec<EventContainer>, LogError> {
        let streams = self.streams.lock();
        Ok(streams.get(stream).cloned().unwrap_or_default())
    }

    async fn append_to_stream(
        &self,
        stream: &str,
        event_type: &str,
        version: i64,
        payload: Vec<u8>,
    ) -> Result<i64, LogError> {
        let mut streams = self.streams.lock();
        let records = streams.entry(stream.to_owned()).or_default();
        records.push(EventContainer::new(event_type, version, payload));

        // The runtime computes versions; with serialized appends they stay
        // dense from zero.
        debug_assert_eq!(version, records.len() as i64 - 1);
        Ok(version)
    }
}
