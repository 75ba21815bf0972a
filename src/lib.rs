//! Stratum - the storage substrate of a small relational database
//!
//! This crate provides the two tightly coupled subsystems underneath the
//! table and transaction layers of a disk-oriented DBMS:
//!
//! - **Frame management** (`buffer`): a bounded pool of page-sized frames
//!   shared across open files, with pinned-frame lookup, allocation and
//!   LRU eviction behind one concurrent facade.
//!   - `FrameManager`: alloc/get/free/evict with pinning discipline
//!   - `FrameAllocator`: the bounded physical pool
//!   - `FrameCache`: resident-page map with eviction ordering
//!   - `Frame`: one page buffer plus pin count and dirty bit
//!
//! - **Redo logging and recovery** (`log`): an append-only write-ahead log
//!   with a buffered writer, a forward iterator, and a replay driver that
//!   applies committed transactions and rolls back everything else.
//!   - `LogManager`: entry building, LSN stamping, commit-time sync, recovery
//!   - `LogBuffer`/`LogFile`: batched writes over a sequential file
//!   - `LogEntryIterator`: forward scan with torn-tail detection
//!
//! The transaction layer plugs in through the `transaction` traits; this
//! crate records and replays intent but never interprets it.
//!
//! # Example
//!
//! ```rust,no_run
//! use stratum::buffer::FrameManager;
//! use stratum::log::{LogEntryType, LogManager};
//! use stratum::common::Rid;
//!
//! // A pool of 50 page frames shared by every open file.
//! let frames = FrameManager::new(50).unwrap();
//! let frame = frames.alloc(3, 0).expect("pool exhausted");
//! frame.page_data_mut()[0] = 0xAB;
//! frame.set_dirty(true);
//! frames.free(3, 0, &frame).unwrap();
//!
//! // Record a transaction in the redo log.
//! let log = LogManager::new("redo.log").unwrap();
//! log.append_begin_trx_log(1).unwrap();
//! log.append_record_log(LogEntryType::Insert, 1, 2, Rid::new(0, 0), 0, b"row")
//!     .unwrap();
//! log.append_commit_trx_log(1, 10).unwrap(); // durable once this returns
//! ```

pub mod buffer;
pub mod common;
pub mod log;
pub mod transaction;

// Re-export commonly used types at the crate root
pub use common::{FrameId, Result, Rid, StratumError, TrxId, PAGE_SIZE};
