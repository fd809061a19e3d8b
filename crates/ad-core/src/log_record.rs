//! Live log records and the bounded buffer that holds them.
//!
//! The backend pushes one record per event in the form
//! `HH:MM:SS | LEVEL | message`. The message itself may contain `|`.

use std::collections::VecDeque;

use thiserror::Error;

use crate::types::{LogEntry, LogLevel};

/// Number of entries kept when no capacity is configured.
pub const DEFAULT_LOG_CAPACITY: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed log record: expected `timestamp | LEVEL | message`")]
pub struct MalformedLogRecord;

/// A parsed record before it is assigned a buffer id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub timestamp: String,
    pub level: LogLevel,
    pub message: String,
}

/// Parse a pipe-delimited record. Everything after the second delimiter is
/// the message, inner delimiters included.
pub fn parse_log_record(raw: &str) -> Result<LogRecord, MalformedLogRecord> {
    let mut parts = raw.splitn(3, '|');
    let (Some(timestamp), Some(level), Some(message)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(MalformedLogRecord);
    };

    Ok(LogRecord {
        timestamp: timestamp.trim().to_string(),
        level: LogLevel::from_wire(level),
        message: message.trim().to_string(),
    })
}

// ---------------------------------------------------------------------------
// LogBuffer
// ---------------------------------------------------------------------------

/// Sliding window over the most recent log entries.
///
/// Entries keep arrival order; once `capacity` is reached the oldest entry is
/// evicted for every new one.
#[derive(Debug, Clone)]
pub struct LogBuffer {
    entries: VecDeque<LogEntry>,
    capacity: usize,
    next_id: u64,
}

impl LogBuffer {
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            next_id: 1,
        }
    }

    /// Append a record, evicting the oldest entry if full. Returns the stored
    /// entry.
    pub fn push(&mut self, record: LogRecord) -> &LogEntry {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        let entry = LogEntry {
            id: self.next_id,
            timestamp: record.timestamp,
            level: record.level,
            message: record.message,
        };
        self.next_id += 1;
        self.entries.push_back(entry);
        self.entries.back().expect("entry was just pushed")
    }

    /// Drop all entries. Ids keep increasing across clears.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn to_vec(&self) -> Vec<LogEntry> {
        self.entries.iter().cloned().collect()
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(msg: &str) -> LogRecord {
        LogRecord {
            timestamp: "12:00:00".into(),
            level: LogLevel::Info,
            message: msg.into(),
        }
    }

    #[test]
    fn parses_well_formed_record() {
        let r = parse_log_record("14:32:15 | INFO | Starting deployment process...").unwrap();
        assert_eq!(r.timestamp, "14:32:15");
        assert_eq!(r.level, LogLevel::Info);
        assert_eq!(r.message, "Starting deployment process...");
    }

    #[test]
    fn message_keeps_inner_delimiters() {
        let r = parse_log_record("14:32:15 | WARNING | a | b | c").unwrap();
        assert_eq!(r.level, LogLevel::Warning);
        assert_eq!(r.message, "a | b | c");
    }

    #[test]
    fn fewer_than_three_parts_is_malformed() {
        assert_eq!(parse_log_record("just text"), Err(MalformedLogRecord));
        assert_eq!(parse_log_record("14:32:15 | INFO"), Err(MalformedLogRecord));
        assert_eq!(parse_log_record(""), Err(MalformedLogRecord));
    }

    #[test]
    fn level_mapping() {
        let level = |s: &str| parse_log_record(&format!("t | {s} | m")).unwrap().level;
        assert_eq!(level("SUCCESS"), LogLevel::Success);
        assert_eq!(level("ERROR"), LogLevel::Error);
        assert_eq!(level("CRITICAL"), LogLevel::Error);
        assert_eq!(level("debug"), LogLevel::Debug);
        assert_eq!(level("TRACE"), LogLevel::Debug);
        assert_eq!(level("WARN"), LogLevel::Warning);
        assert_eq!(level("NOTICE"), LogLevel::Info);
    }

    #[test]
    fn buffer_evicts_oldest_first() {
        let mut buf = LogBuffer::new(3);
        for i in 0..5 {
            buf.push(record(&format!("m{i}")));
        }
        let msgs: Vec<&str> = buf.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(msgs, ["m2", "m3", "m4"]);
        let ids: Vec<u64> = buf.iter().map(|e| e.id).collect();
        assert_eq!(ids, [3, 4, 5]);
    }

    #[test]
    fn buffer_never_exceeds_capacity() {
        let mut buf = LogBuffer::default();
        for i in 0..(DEFAULT_LOG_CAPACITY + 37) {
            buf.push(record(&i.to_string()));
            assert!(buf.len() <= DEFAULT_LOG_CAPACITY);
        }
        assert_eq!(buf.len(), DEFAULT_LOG_CAPACITY);
        assert_eq!(buf.iter().next().unwrap().message, "37");
        assert_eq!(buf.iter().last().unwrap().message, (DEFAULT_LOG_CAPACITY + 36).to_string());
    }

    #[test]
    fn clear_keeps_ids_unique() {
        let mut buf = LogBuffer::new(10);
        buf.push(record("a"));
        buf.push(record("b"));
        buf.clear();
        assert!(buf.is_empty());
        let id = buf.push(record("c")).id;
        assert_eq!(id, 3);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut buf = LogBuffer::new(0);
        buf.push(record("a"));
        buf.push(record("b"));
        assert_eq!(buf.capacity(), 1);
        assert_eq!(buf.to_vec()[0].message, "b");
    }
}
