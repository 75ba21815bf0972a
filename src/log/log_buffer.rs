use std::collections::VecDeque;

use crate::common::Result;

use super::{LogEntry, LogFile};

/// LogBuffer accumulates serialized entries until they are flushed to the
/// log file. Entries are kept whole (one serialized blob each) so a flush
/// can never split an entry across a failure: whatever reached the file is
/// a clean prefix of whole entries, the rest stays buffered.
pub struct LogBuffer {
    entries: VecDeque<Vec<u8>>,
    bytes: usize,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::new(),
            bytes: 0,
        }
    }

    /// Serializes `entry` and appends it behind every earlier entry.
    pub fn append_log_entry(&mut self, entry: &LogEntry) -> Result<()> {
        let bytes = entry.encode();
        self.bytes += bytes.len();
        self.entries.push_back(bytes);
        Ok(())
    }

    /// Writes buffered entries to `log_file` in insertion order. Entries
    /// written before an error are dropped from the buffer; the failing
    /// entry and everything behind it remain queued.
    pub fn flush_buffer(&mut self, log_file: &mut LogFile) -> Result<()> {
        while let Some(front) = self.entries.front() {
            log_file.append(front)?;
            self.bytes -= front.len();
            self.entries.pop_front();
        }
        Ok(())
    }

    /// Total buffered bytes.
    pub fn bytes(&self) -> usize {
        self.bytes
    }

    /// Number of buffered entries.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new()
    }
}
