use super::types::Lsn;

/// Size of a page in bytes (4 KB)
pub const PAGE_SIZE: usize = 4096;

/// Default number of frames in the frame pool
pub const DEFAULT_POOL_SIZE: usize = 50;

/// Log buffer high-water mark in bytes. Once buffered entries exceed this,
/// the flush daemon is woken to drain them to the log file.
pub const LOG_BUFFER_HIGH_WATERMARK: usize = 32 * 1024;

/// Invalid LSN constant
pub const INVALID_LSN: Lsn = 0;
