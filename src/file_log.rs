//! File-backed event log with a framed binary on-disk format.
//!
//! Each stream lives in its own `{stream}.bin` file inside a configured
//! folder. Appends write one self-delimited frame at the end of the file;
//! reads scan frames from the start and verify their integrity markers, so
//! torn or overwritten bytes surface as [`LogError::Corrupt`] instead of a
//! silently-wrong record.
//!
//! Frame layout, all integers little-endian:
//!
//! ```text
//! [4B magic 0A A0 AA AA][4B i32 record length][record][4B zero footer]
//! record = [varint-length-prefixed UTF-8 event type][8B i64 version]
//!          [4B i32 payload length][payload][8B i64 unix-millis timestamp]
//! ```
//!
//! The event-type length prefix is a 7-bit varint (low 7 bits per byte,
//! high bit set on continuation).

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::LogError;
use crate::event::EventContainer;
use crate::log::EventLog;

/// First four bytes of every frame.
const FRAME_MAGIC: [u8; 4] = [0x0A, 0xA0, 0xAA, 0xAA];

/// Last four bytes of every frame.
const FRAME_FOOTER: [u8; 4] = [0x00, 0x00, 0x00, 0x00];

/// An event log storing one binary file per stream.
///
/// Concurrent readers of a log instance run in parallel with each other but
/// never with a writer; an append holds the write half of a single
/// reader-writer lock, excluding all readers for its duration.
#[derive(Debug)]
pub struct FileEventLog {
    folder: PathBuf,
    lock: RwLock<()>,
}

impl FileEventLog {
    /// Create a file log rooted at the given folder.
    ///
    /// The folder is created on first append if it does not exist.
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        let folder = folder.into();
        tracing::info!(folder = %folder.display(), "storing events in per-stream binary files");
        Self {
            folder,
            lock: RwLock::new(()),
        }
    }

    /// The file holding a stream's frames: `<folder>/{stream}.bin`.
    fn stream_path(&self, stream: &str) -> PathBuf {
        self.folder.join(format!("{stream}.bin"))
    }
}

#[async_trait]
impl EventLog for FileEventLog {
    async fn read_stream(&self, stream: &str) -> Result<Vec<EventContainer>, LogError> {
        let _guard = self.lock.read().await;

        let data = match std::fs::read(self.stream_path(stream)) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(LogError::Io(e)),
        };

        decode_frames(stream, &data)
    }

    async fn append_to_stream(
        &self,
        stream: &str,
        event_type: &str,
        version: i64,
        payload: Vec<u8>,
    ) -> Result<i64, LogError> {
        let _guard = self.lock.write().await;

        std::fs::create_dir_all(&self.folder)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.stream_path(stream))?;

        let container = EventContainer::new(event_type, version, payload);
        file.write_all(&encode_frame(&container))?;

        tracing::debug!(stream, event_type, version, "appended frame");
        Ok(version)
    }
}

/// Encode one record as a complete frame.
fn encode_frame(container: &EventContainer) -> Vec<u8> {
    let type_bytes = container.event_type.as_bytes();
    let mut record = Vec::with_capacity(type_bytes.len() + container.payload.len() + 32);
    write_varint(&mut record, type_bytes.len() as u64);
    record.extend_from_slice(type_bytes);
    record.extend_from_slice(&container.version.to_le_bytes());
    record.extend_from_slice(&(container.payload.len() as i32).to_le_bytes());
    record.extend_from_slice(&container.payload);
    record.extend_from_slice(&container.timestamp.to_le_bytes());

    let mut frame = Vec::with_capacity(record.len() + 12);
    frame.extend_from_slice(&FRAME_MAGIC);
    frame.extend_from_slice(&(record.len() as i32).to_le_bytes());
    frame.extend_from_slice(&record);
    frame.extend_from_slice(&FRAME_FOOTER);
    frame
}

/// Scan a stream file's bytes into records.
///
/// Fewer than 4 bytes remaining is a clean end-of-stream. Once a frame's
/// magic has matched, any truncation or marker mismatch aborts the read
/// with [`LogError::Corrupt`].
fn decode_frames(stream: &str, data: &[u8]) -> Result<Vec<EventContainer>, LogError> {
    let corrupt = |detail: &'static str| LogError::Corrupt {
        stream: stream.to_owned(),
        detail,
    };

    let mut records = Vec::new();
    let mut pos = 0usize;
    while data.len() - pos >= 4 {
        if data[pos..pos + 4] != FRAME_MAGIC {
            return Err(corrupt("frame magic mismatch"));
        }
        pos += 4;

        let len = read_i32(data, &mut pos).ok_or_else(|| corrupt("truncated frame length"))?;
        if len < 0 {
            return Err(corrupt("negative frame length"));
        }
        let len = len as usize;
        if data.len() - pos < len {
            return Err(corrupt("truncated record"));
        }
        let record = &data[pos..pos + len];
        pos += len;

        if data.len() - pos < 4 {
            return Err(corrupt("truncated footer"));
        }
        if data[pos..pos + 4] != FRAME_FOOTER {
            return Err(corrupt("frame footer not zero"));
        }
        pos += 4;

        records.push(decode_record(stream, record)?);
    }

    Ok(records)
}

/// Decode one frame's inner record.
fn decode_record(stream: &str, record: &[u8]) -> Result<EventContainer, LogError> {
    let corrupt = |detail: &'static str| LogError::Corrupt {
        stream: stream.to_owned(),
        detail,
    };

    let mut pos = 0usize;
    let type_len =
        read_varint(record, &mut pos).ok_or_else(|| corrupt("bad event type length"))? as usize;
    if record.len() - pos < type_len {
        return Err(corrupt("truncated event type"));
    }
    let event_type = std::str::from_utf8(&record[pos..pos + type_len])
        .map_err(|_| corrupt("event type not UTF-8"))?
        .to_owned();
    pos += type_len;

    let version = read_i64(record, &mut pos).ok_or_else(|| corrupt("truncated version"))?;
    let payload_len =
        read_i32(record, &mut pos).ok_or_else(|| corrupt("truncated payload length"))?;
    if payload_len < 0 {
        return Err(corrupt("negative payload length"));
    }
    let payload_len = payload_len as usize;
    if record.len() - pos < payload_len {
        return Err(corrupt("truncated payload"));
    }
    let payload = record[pos..pos + payload_len].to_vec();
    pos += payload_len;

    let timestamp = read_i64(record, &mut pos).ok_or_else(|| corrupt("truncated timestamp"))?;

    Ok(EventContainer {
        event_type,
        version,
        payload,
        timestamp,
    })
}

/// Write a 7-bit varint: low 7 bits per byte, high bit set on continuation.
fn write_varint(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            buf.push(byte);
            return;
        }
        buf.push(byte | 0x80);
    }
}

/// Read a 7-bit varint. Returns `None` on truncation or overflow.
fn read_varint(data: &[u8], pos: &mut usize) -> Option<u64> {
    let mut value = 0u64;
    for shift in (0..64).step_by(7) {
        let byte = *data.get(*pos)?;
        *pos += 1;
        value |= u64::from(byte & 0x7F) << shift;
        if byte & 0x80 == 0 {
            return Some(value);
        }
    }
    None
}

fn read_i32(data: &[u8], pos: &mut usize) -> Option<i32> {
    let bytes: [u8; 4] = data.get(*pos..*pos + 4)?.try_into().ok()?;
    *pos += 4;
    Some(i32::from_le_bytes(bytes))
}

fn read_i64(data: &[u8], pos: &mut usize) -> Option<i64> {
    let bytes: [u8; 8] = data.get(*pos..*pos + 8)?.try_into().ok()?;
    *pos += 8;
    Some(i64::from_le_bytes(bytes))
}
