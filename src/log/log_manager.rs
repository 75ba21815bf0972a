use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::common::{Lsn, Result, Rid, StratumError, TrxId, LOG_BUFFER_HIGH_WATERMARK};
use crate::transaction::TrxManager;

use super::log_flusher::LogFlusher;
use super::{LogBuffer, LogEntry, LogEntryIterator, LogEntryType, LogFile};

/// Buffer and file move together under one mutex so entries reach the file
/// exactly in append order, whichever thread performs the flush.
pub(crate) struct LogInner {
    pub(crate) buffer: LogBuffer,
    pub(crate) file: LogFile,
}

/// LogManager owns the redo log: it builds entries, stamps them with
/// monotonic LSNs, buffers them, and forces them to stable storage when a
/// transaction commits. It also drives crash recovery over the same file.
///
/// All append entry points are safe to call from multiple threads; entries
/// land in the file in the order `append_log` accepted them.
pub struct LogManager {
    inner: Arc<Mutex<LogInner>>,
    /// Next LSN to hand out
    next_lsn: AtomicI64,
    flusher: LogFlusher,
}

impl LogManager {
    /// Opens (or creates) the redo log at `path` with an empty buffer.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = LogFile::open(path)?;
        let inner = Arc::new(Mutex::new(LogInner {
            buffer: LogBuffer::new(),
            file,
        }));
        let flusher = LogFlusher::new(Arc::clone(&inner));
        Ok(Self {
            inner,
            next_lsn: AtomicI64::new(1),
            flusher,
        })
    }

    /// Records the start of transaction `trx_id`.
    pub fn append_begin_trx_log(&self, trx_id: TrxId) -> Result<()> {
        self.append_log(LogEntry::mtr(LogEntryType::MtrBegin, trx_id)?)
    }

    /// Records that transaction `trx_id` rolled back.
    pub fn append_rollback_trx_log(&self, trx_id: TrxId) -> Result<()> {
        self.append_log(LogEntry::mtr(LogEntryType::MtrRollback, trx_id)?)
    }

    /// Records the commit of `trx_id` and forces the log to disk. When this
    /// returns Ok the commit entry and everything before it are durable; on
    /// error the commit must be treated as not durable.
    pub fn append_commit_trx_log(&self, trx_id: TrxId, commit_xid: i32) -> Result<()> {
        self.append_log(LogEntry::commit(trx_id, commit_xid))?;
        self.sync().map_err(|err| {
            warn!(trx_id, %err, "commit log sync failed, commit is not durable");
            err
        })
    }

    /// Records a row mutation belonging to `trx_id`.
    pub fn append_record_log(
        &self,
        log_type: LogEntryType,
        trx_id: TrxId,
        table_id: i32,
        rid: Rid,
        data_offset: i32,
        data: &[u8],
    ) -> Result<()> {
        self.append_log(LogEntry::record(
            log_type,
            trx_id,
            table_id,
            rid,
            data_offset,
            data,
        )?)
    }

    /// Stamps the entry with the next LSN and queues it behind every
    /// earlier entry. Wakes the flush daemon past the high-water mark.
    pub fn append_log(&self, mut entry: LogEntry) -> Result<()> {
        let lsn = self.next_lsn.fetch_add(1, Ordering::SeqCst);
        entry.set_lsn(lsn);

        let mut inner = self.inner.lock();
        inner.buffer.append_log_entry(&entry)?;
        let over_high_water = inner.buffer.bytes() >= LOG_BUFFER_HIGH_WATERMARK;
        drop(inner);

        if over_high_water {
            self.flusher.wake();
        }
        Ok(())
    }

    /// Flushes every buffered entry and fsyncs the log file.
    pub fn sync(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        let LogInner { buffer, file } = &mut *inner;
        buffer.flush_buffer(file)?;
        file.sync()
    }

    /// Replays the log against `db` through `trx_manager`.
    ///
    /// One forward pass: begin entries create transactions, and every other
    /// entry for a transaction is handed to its `redo` (record mutations are
    /// staged, a commit applies the staged work). Every transaction still
    /// open at the end of the scan is rolled back. A torn trailing record ends the scan early;
    /// the rollback pass still runs, so a transaction whose commit entry was
    /// cut short comes back as rolled back.
    pub fn recover<D, M>(&self, db: &mut D, trx_manager: &mut M) -> Result<()>
    where
        M: TrxManager<D>,
    {
        let mut inner = self.inner.lock();
        let mut uncommitted_trx_ids: HashSet<TrxId> = HashSet::new();
        let mut max_lsn: Lsn = 0;

        let mut it = LogEntryIterator::new(&mut inner.file);
        loop {
            match it.next() {
                Ok(()) => {}
                Err(StratumError::RecordEof) => break,
                Err(err) => {
                    warn!(%err, "log tail is torn, stopping replay at the last clean entry");
                    break;
                }
            }
            let entry = match it.log_entry() {
                Some(entry) => entry,
                None => break,
            };
            max_lsn = max_lsn.max(entry.lsn());
            let trx_id = entry.trx_id();

            match entry.log_type() {
                LogEntryType::MtrBegin => {
                    trx_manager.create_trx(trx_id);
                    uncommitted_trx_ids.insert(trx_id);
                }
                LogEntryType::MtrCommit => match trx_manager.find_trx(trx_id) {
                    Some(trx) => {
                        trx.redo(db, entry)?;
                        uncommitted_trx_ids.remove(&trx_id);
                    }
                    None => warn!(trx_id, "commit entry for unknown transaction, skipped"),
                },
                LogEntryType::Error => {}
                LogEntryType::MtrRollback
                | LogEntryType::Insert
                | LogEntryType::Delete
                | LogEntryType::Update => match trx_manager.find_trx(trx_id) {
                    Some(trx) => trx.redo(db, entry)?,
                    None => warn!(trx_id, "log entry for unknown transaction, skipped"),
                },
            }
        }

        debug!(
            uncommitted = uncommitted_trx_ids.len(),
            "replay scan finished, rolling back open transactions"
        );
        for trx_id in uncommitted_trx_ids {
            match trx_manager.find_trx(trx_id) {
                Some(trx) => trx.rollback()?,
                None => warn!(trx_id, "open transaction vanished before rollback"),
            }
        }

        // Future appends continue the LSN sequence found in the log.
        self.next_lsn.fetch_max(max_lsn + 1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_append_buffers_until_sync() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("redo.log");
        let lm = LogManager::new(&path).unwrap();

        lm.append_begin_trx_log(1).unwrap();
        assert_eq!(lm.inner.lock().buffer.entry_count(), 1);

        lm.sync().unwrap();
        let inner = lm.inner.lock();
        assert!(inner.buffer.is_empty());
        assert!(inner.file.len() > 0);
    }

    #[test]
    fn test_lsn_is_monotonic_per_entry() {
        let dir = tempdir().unwrap();
        let lm = LogManager::new(dir.path().join("redo.log")).unwrap();

        lm.append_begin_trx_log(1).unwrap();
        lm.append_begin_trx_log(2).unwrap();
        lm.sync().unwrap();

        let mut inner = lm.inner.lock();
        let mut it = LogEntryIterator::new(&mut inner.file);
        it.next().unwrap();
        let first = it.log_entry().unwrap().lsn();
        it.next().unwrap();
        let second = it.log_entry().unwrap().lsn();
        assert!(second > first);
    }

    #[test]
    fn test_commit_append_is_durable_on_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("redo.log");

        {
            let lm = LogManager::new(&path).unwrap();
            lm.append_begin_trx_log(7).unwrap();
            lm.append_commit_trx_log(7, 70).unwrap();
            // No explicit sync: commit already forced everything out.
        }

        let mut file = LogFile::open(&path).unwrap();
        let mut it = LogEntryIterator::new(&mut file);
        it.next().unwrap();
        assert_eq!(it.log_entry().unwrap().log_type(), LogEntryType::MtrBegin);
        it.next().unwrap();
        assert_eq!(it.log_entry().unwrap().log_type(), LogEntryType::MtrCommit);
    }
}
