use crate::common::{Result, StratumError};

use super::{LogEntry, LogEntryHeader, LogFile, LOG_ENTRY_HEADER_SIZE};

/// Forward cursor over a log file. Each `next` consumes one framed entry;
/// the previously parsed entry is dropped before its replacement is built.
///
/// `next` distinguishes the two ways a scan can end: `RecordEof` when the
/// cursor sits exactly on end-of-file (clean shutdown), any other error when
/// a record is cut short (torn tail from a crash mid-write).
pub struct LogEntryIterator<'a> {
    log_file: &'a mut LogFile,
    entry: Option<LogEntry>,
}

impl<'a> LogEntryIterator<'a> {
    /// Binds the iterator to `log_file`, positioned at its start.
    pub fn new(log_file: &'a mut LogFile) -> Self {
        log_file.rewind();
        Self {
            log_file,
            entry: None,
        }
    }

    /// Reads the next entry. Returns `RecordEof` on clean end of log.
    pub fn next(&mut self) -> Result<()> {
        self.entry = None;

        if self.log_file.eof() {
            return Err(StratumError::RecordEof);
        }

        let mut header_buf = [0u8; LOG_ENTRY_HEADER_SIZE];
        self.log_file.read(&mut header_buf)?;
        let header = LogEntryHeader::decode(&header_buf)?;

        let entry_len = header.log_entry_len as u64;
        if self.log_file.remaining() < entry_len {
            return Err(StratumError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "log entry payload cut short",
            )));
        }

        let mut payload = vec![0u8; entry_len as usize];
        if entry_len > 0 {
            self.log_file.read(&mut payload)?;
        }

        self.entry = Some(LogEntry::decode(header, &payload)?);
        Ok(())
    }

    /// True while the iterator holds a successfully parsed entry.
    pub fn valid(&self) -> bool {
        self.entry.is_some()
    }

    /// The last successfully parsed entry.
    pub fn log_entry(&self) -> Option<&LogEntry> {
        self.entry.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Rid;
    use crate::log::LogEntryType;
    use tempfile::tempdir;

    fn write_entries(log_file: &mut LogFile, entries: &[LogEntry]) {
        for entry in entries {
            log_file.append(&entry.encode()).unwrap();
        }
    }

    #[test]
    fn test_iterator_yields_entries_in_order() {
        let dir = tempdir().unwrap();
        let mut lf = LogFile::open(dir.path().join("redo.log")).unwrap();

        let entries = vec![
            LogEntry::mtr(LogEntryType::MtrBegin, 1).unwrap(),
            LogEntry::record(LogEntryType::Insert, 1, 4, Rid::new(2, 0), 0, b"abc").unwrap(),
            LogEntry::commit(1, 9),
        ];
        write_entries(&mut lf, &entries);

        let mut it = LogEntryIterator::new(&mut lf);
        for expected in &entries {
            it.next().unwrap();
            assert!(it.valid());
            assert_eq!(it.log_entry().unwrap(), expected);
        }

        assert!(matches!(it.next(), Err(StratumError::RecordEof)));
        assert!(!it.valid());
    }

    #[test]
    fn test_iterator_on_empty_log() {
        let dir = tempdir().unwrap();
        let mut lf = LogFile::open(dir.path().join("redo.log")).unwrap();

        let mut it = LogEntryIterator::new(&mut lf);
        assert!(matches!(it.next(), Err(StratumError::RecordEof)));
    }

    #[test]
    fn test_iterator_detects_torn_payload() {
        let dir = tempdir().unwrap();
        let mut lf = LogFile::open(dir.path().join("redo.log")).unwrap();

        let entry =
            LogEntry::record(LogEntryType::Insert, 1, 4, Rid::new(2, 0), 0, b"abcdef").unwrap();
        let bytes = entry.encode();
        // Header lands intact, payload is cut short.
        lf.append(&bytes[..LOG_ENTRY_HEADER_SIZE + 3]).unwrap();

        let mut it = LogEntryIterator::new(&mut lf);
        match it.next() {
            Err(StratumError::Io(_)) => {}
            other => panic!("expected torn-tail error, got {:?}", other),
        }
        assert!(!it.valid());
    }

    #[test]
    fn test_iterator_detects_torn_header() {
        let dir = tempdir().unwrap();
        let mut lf = LogFile::open(dir.path().join("redo.log")).unwrap();

        let entry = LogEntry::mtr(LogEntryType::MtrBegin, 1).unwrap();
        let bytes = entry.encode();
        lf.append(&bytes[..LOG_ENTRY_HEADER_SIZE - 4]).unwrap();

        let mut it = LogEntryIterator::new(&mut lf);
        assert!(matches!(it.next(), Err(StratumError::Io(_))));
    }

    #[test]
    fn test_iterator_yields_clean_prefix_before_torn_tail() {
        let dir = tempdir().unwrap();
        let mut lf = LogFile::open(dir.path().join("redo.log")).unwrap();

        let good = LogEntry::mtr(LogEntryType::MtrBegin, 1).unwrap();
        lf.append(&good.encode()).unwrap();

        let torn = LogEntry::commit(1, 3);
        let bytes = torn.encode();
        lf.append(&bytes[..bytes.len() - 2]).unwrap();

        let mut it = LogEntryIterator::new(&mut lf);
        it.next().unwrap();
        assert_eq!(it.log_entry().unwrap(), &good);
        assert!(matches!(it.next(), Err(StratumError::Io(_))));
    }
}
