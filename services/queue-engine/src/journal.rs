//! Append-only event journal with checksums
//!
//! Durable, append-friendly storage for the queue. Each committed event is
//! written as one length-prefixed, CRC32C-checked entry; on open, the file
//! is replayed to rebuild in-memory state. A truncated or corrupt tail
//! (torn final write) is tolerated; corruption earlier in the file is not.
//!
//! # Binary Format (per entry)
//! ```text
//! [body_len:  u32]
//! [sequence:  u64]
//! [timestamp: i64]   // Unix microseconds at commit time
//! [payload_len: u32][payload: bincode-encoded QueueEvent]
//! [checksum: u32]    // CRC32C over sequence+timestamp+payload
//! ```

use crate::events::QueueEvent;
use crc32c::crc32c;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Journal file name inside the engine data directory
pub const JOURNAL_FILE: &str = "queue.journal";

// ── Errors ──────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum JournalError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Corrupt journal entry at sequence {sequence}: {reason}")]
    Corrupt { sequence: u64, reason: String },
}

// ── Journal Entry ───────────────────────────────────────────────────

/// A single persisted event with its integrity metadata
#[derive(Debug, Clone, PartialEq)]
pub struct JournalEntry {
    /// Monotonic commit sequence, gapless from 0
    pub sequence: u64,
    /// Unix microsecond timestamp at commit time
    pub timestamp: i64,
    /// Bincode-serialized QueueEvent
    pub payload: Vec<u8>,
    /// CRC32C over (sequence ++ timestamp ++ payload)
    pub checksum: u32,
}

impl JournalEntry {
    /// Create a new entry, computing the checksum automatically
    pub fn new(sequence: u64, timestamp: i64, payload: Vec<u8>) -> Self {
        let checksum = Self::compute_checksum(sequence, timestamp, &payload);
        Self {
            sequence,
            timestamp,
            payload,
            checksum,
        }
    }

    /// Encode an event into a ready-to-append entry
    pub fn for_event(
        sequence: u64,
        timestamp: i64,
        event: &QueueEvent,
    ) -> Result<Self, JournalError> {
        let payload =
            bincode::serialize(event).map_err(|e| JournalError::Serialization(e.to_string()))?;
        Ok(Self::new(sequence, timestamp, payload))
    }

    /// Decode the payload back into an event
    pub fn event(&self) -> Result<QueueEvent, JournalError> {
        bincode::deserialize(&self.payload)
            .map_err(|e| JournalError::Serialization(e.to_string()))
    }

    fn compute_checksum(sequence: u64, timestamp: i64, payload: &[u8]) -> u32 {
        let mut buf = Vec::with_capacity(16 + payload.len());
        buf.extend_from_slice(&sequence.to_le_bytes());
        buf.extend_from_slice(&timestamp.to_le_bytes());
        buf.extend_from_slice(payload);
        crc32c(&buf)
    }

    /// Validate the stored checksum against the recomputed value
    pub fn verify_checksum(&self) -> bool {
        self.checksum == Self::compute_checksum(self.sequence, self.timestamp, &self.payload)
    }

    /// Serialize entry to the binary wire format
    pub fn to_bytes(&self) -> Vec<u8> {
        let payload_len = self.payload.len() as u32;
        // body = 8 (seq) + 8 (ts) + 4 (pl_len) + payload + 4 (crc)
        let body_len: u32 = 8 + 8 + 4 + payload_len + 4;

        let mut buf = Vec::with_capacity(4 + body_len as usize);
        buf.extend_from_slice(&body_len.to_le_bytes());
        buf.extend_from_slice(&self.sequence.to_le_bytes());
        buf.extend_from_slice(&self.timestamp.to_le_bytes());
        buf.extend_from_slice(&payload_len.to_le_bytes());
        buf.extend_from_slice(&self.payload);
        buf.extend_from_slice(&self.checksum.to_le_bytes());
        buf
    }

    /// Deserialize one entry from the front of `data`.
    ///
    /// Returns `(entry, bytes_consumed)`, or `None` when the remaining
    /// bytes are an incomplete tail.
    pub fn from_bytes(data: &[u8]) -> Result<Option<(Self, usize)>, JournalError> {
        if data.len() < 4 {
            return Ok(None);
        }
        let body_len = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;

        // Minimum body: 8 + 8 + 4 + 0 + 4 = 24. Larger than any sane event
        // payload means the length prefix itself is garbage.
        if body_len < 24 || body_len > 16_000_000 {
            return Err(JournalError::Corrupt {
                sequence: 0,
                reason: format!("implausible body length {}", body_len),
            });
        }

        let total = 4 + body_len;
        if data.len() < total {
            return Ok(None);
        }

        let body = &data[4..total];
        let sequence = u64::from_le_bytes(body[0..8].try_into().expect("fixed slice"));
        let timestamp = i64::from_le_bytes(body[8..16].try_into().expect("fixed slice"));
        let payload_len = u32::from_le_bytes(body[16..20].try_into().expect("fixed slice")) as usize;

        if 20 + payload_len + 4 != body.len() {
            return Err(JournalError::Corrupt {
                sequence,
                reason: "payload length disagrees with body length".to_string(),
            });
        }

        let payload = body[20..20 + payload_len].to_vec();
        let checksum =
            u32::from_le_bytes(body[20 + payload_len..].try_into().expect("fixed slice"));

        let entry = Self {
            sequence,
            timestamp,
            payload,
            checksum,
        };
        if !entry.verify_checksum() {
            return Err(JournalError::Corrupt {
                sequence,
                reason: "checksum mismatch".to_string(),
            });
        }
        Ok(Some((entry, total)))
    }
}

// ── Journal Writer ──────────────────────────────────────────────────

/// Append-only journal writer; every append is flushed before returning
pub struct JournalWriter {
    writer: BufWriter<File>,
    path: PathBuf,
    next_sequence: u64,
}

impl JournalWriter {
    /// Open the journal for appending, creating the directory if needed
    pub fn open(dir: &Path) -> Result<Self, JournalError> {
        fs::create_dir_all(dir)?;
        let path = dir.join(JOURNAL_FILE);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            path,
            next_sequence: 0,
        })
    }

    /// Set the next expected sequence number (used after replay)
    pub fn set_next_sequence(&mut self, seq: u64) {
        self.next_sequence = seq;
    }

    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one event; assigns the next sequence and flushes to the OS
    pub fn append_event(
        &mut self,
        timestamp: i64,
        event: &QueueEvent,
    ) -> Result<JournalEntry, JournalError> {
        let entry = JournalEntry::for_event(self.next_sequence, timestamp, event)?;
        self.writer.write_all(&entry.to_bytes())?;
        self.writer.flush()?;
        self.next_sequence += 1;
        Ok(entry)
    }

    /// Flush and fsync (used before shutdown)
    pub fn sync(&mut self) -> Result<(), JournalError> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        Ok(())
    }
}

// ── Journal Reader ──────────────────────────────────────────────────

/// Read every intact event from the journal, in sequence order.
///
/// A truncated final entry (torn write) ends the replay cleanly; a checksum
/// mismatch or sequence gap earlier in the file is a hard error.
pub fn replay(dir: &Path) -> Result<Vec<QueueEvent>, JournalError> {
    let path = dir.join(JOURNAL_FILE);
    if !path.exists() {
        return Ok(Vec::new());
    }

    let mut data = Vec::new();
    File::open(&path)?.read_to_end(&mut data)?;

    let mut events = Vec::new();
    let mut offset = 0usize;
    let mut expected_sequence = 0u64;

    while offset < data.len() {
        match JournalEntry::from_bytes(&data[offset..])? {
            Some((entry, consumed)) => {
                if entry.sequence != expected_sequence {
                    return Err(JournalError::Corrupt {
                        sequence: entry.sequence,
                        reason: format!("sequence gap, expected {}", expected_sequence),
                    });
                }
                events.push(entry.event()?);
                expected_sequence += 1;
                offset += consumed;
            }
            None => {
                tracing::warn!(
                    offset,
                    total = data.len(),
                    "journal ends with an incomplete entry, ignoring tail"
                );
                break;
            }
        }
    }

    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;
    use types::ids::{ItemId, MatchId};

    fn sample_event(n: u8) -> QueueEvent {
        QueueEvent::MatchFailed {
            match_id: MatchId::new(),
            reason: format!("reason-{n}"),
            at: Utc::now(),
        }
    }

    #[test]
    fn test_entry_checksum_roundtrip() {
        let entry = JournalEntry::for_event(0, 1_700_000_000_000_000, &sample_event(1)).unwrap();
        assert!(entry.verify_checksum());
        let bytes = entry.to_bytes();
        let (decoded, consumed) = JournalEntry::from_bytes(&bytes).unwrap().unwrap();
        assert_eq!(consumed, bytes.len());
        assert_eq!(entry, decoded);
    }

    #[test]
    fn test_entry_detects_tamper() {
        let entry = JournalEntry::for_event(0, 1, &sample_event(1)).unwrap();
        let mut bytes = entry.to_bytes();
        let mid = bytes.len() / 2;
        bytes[mid] ^= 0xFF;
        assert!(JournalEntry::from_bytes(&bytes).is_err());
    }

    #[test]
    fn test_incomplete_tail_returns_none() {
        let entry = JournalEntry::for_event(0, 1, &sample_event(1)).unwrap();
        let bytes = entry.to_bytes();
        assert!(JournalEntry::from_bytes(&bytes[..bytes.len() - 3])
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_append_and_replay() {
        let tmp = TempDir::new().unwrap();
        let mut writer = JournalWriter::open(tmp.path()).unwrap();
        let mut written = Vec::new();
        for n in 0..5 {
            let event = sample_event(n);
            writer.append_event(1_000 + n as i64, &event).unwrap();
            written.push(event);
        }
        writer.sync().unwrap();
        drop(writer);

        let replayed = replay(tmp.path()).unwrap();
        assert_eq!(replayed, written);
    }

    #[test]
    fn test_replay_missing_file_is_empty() {
        let tmp = TempDir::new().unwrap();
        assert!(replay(tmp.path()).unwrap().is_empty());
    }

    #[test]
    fn test_replay_tolerates_torn_tail() {
        let tmp = TempDir::new().unwrap();
        let mut writer = JournalWriter::open(tmp.path()).unwrap();
        writer.append_event(1, &sample_event(0)).unwrap();
        writer.append_event(2, &sample_event(1)).unwrap();
        writer.sync().unwrap();
        let path = writer.path().to_path_buf();
        drop(writer);

        // Chop a few bytes off the end to simulate a torn final write
        let data = fs::read(&path).unwrap();
        fs::write(&path, &data[..data.len() - 4]).unwrap();

        let replayed = replay(tmp.path()).unwrap();
        assert_eq!(replayed.len(), 1, "intact prefix survives, torn tail dropped");
    }

    #[test]
    fn test_replay_rejects_sequence_gap() {
        let tmp = TempDir::new().unwrap();
        let entry_a = JournalEntry::for_event(0, 1, &sample_event(0)).unwrap();
        let entry_b = JournalEntry::for_event(7, 2, &sample_event(1)).unwrap();
        let mut bytes = entry_a.to_bytes();
        bytes.extend_from_slice(&entry_b.to_bytes());
        fs::write(tmp.path().join(JOURNAL_FILE), bytes).unwrap();

        assert!(matches!(
            replay(tmp.path()),
            Err(JournalError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_writer_sequence_advances() {
        let tmp = TempDir::new().unwrap();
        let mut writer = JournalWriter::open(tmp.path()).unwrap();
        assert_eq!(writer.next_sequence(), 0);
        writer.append_event(1, &sample_event(0)).unwrap();
        writer.append_event(2, &sample_event(1)).unwrap();
        assert_eq!(writer.next_sequence(), 2);
    }

    #[test]
    fn test_reopen_continues_sequence() {
        let tmp = TempDir::new().unwrap();
        {
            let mut writer = JournalWriter::open(tmp.path()).unwrap();
            writer.append_event(1, &sample_event(0)).unwrap();
            writer.sync().unwrap();
        }
        let replayed = replay(tmp.path()).unwrap();
        let mut writer = JournalWriter::open(tmp.path()).unwrap();
        writer.set_next_sequence(replayed.len() as u64);
        writer
            .append_event(2, &QueueEvent::ItemCancelled {
                item_id: ItemId::new(),
                at: Utc::now(),
            })
            .unwrap();
        writer.sync().unwrap();

        assert_eq!(replay(tmp.path()).unwrap().len(), 2);
    }
}
