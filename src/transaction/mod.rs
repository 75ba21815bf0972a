//! Seam toward the transaction layer.
//!
//! The storage substrate records and replays transactional intent but never
//! interprets it: redo and rollback semantics live with the MVCC transaction
//! manager above this crate. Recovery receives that manager (and the opaque
//! database handle `D` it operates on) explicitly instead of reaching for a
//! global.

use crate::common::{Result, TrxId};
use crate::log::LogEntry;

/// A transaction as recovery sees it: a sink for replayed log entries and a
/// rollback switch. Record mutations are staged inside the transaction until
/// its commit entry is observed.
pub trait Trx<D> {
    /// Replays one log entry against the database.
    fn redo(&mut self, db: &mut D, entry: &LogEntry) -> Result<()>;

    /// Discards everything this transaction staged.
    fn rollback(&mut self) -> Result<()>;
}

/// Registry of transactions, keyed by the ids recorded in the log.
pub trait TrxManager<D> {
    /// Creates (and registers) a transaction with the given id.
    fn create_trx(&mut self, trx_id: TrxId) -> &mut dyn Trx<D>;

    /// Looks up a previously created transaction.
    fn find_trx(&mut self, trx_id: TrxId) -> Option<&mut dyn Trx<D>>;
}
