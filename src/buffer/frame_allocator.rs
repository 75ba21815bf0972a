use std::sync::Arc;

use crate::common::{Result, StratumError};

use super::Frame;

/// FrameAllocator owns the bounded physical pool. It hands out unused
/// frames and takes them back; it does not know which page a frame holds,
/// that is the frame manager's job.
///
/// Not synchronized on its own. The frame manager mutates it strictly under
/// its mutex.
pub struct FrameAllocator {
    /// Frames not currently handed out
    free_list: Vec<Arc<Frame>>,
    /// Total number of frames in the pool
    pool_num: usize,
}

impl FrameAllocator {
    /// Preallocates a pool of `pool_num` frames. Surfaces `NoMem` when the
    /// host allocation fails instead of aborting.
    pub fn new(pool_num: usize) -> Result<Self> {
        let mut free_list = Vec::new();
        free_list
            .try_reserve_exact(pool_num)
            .map_err(|_| StratumError::NoMem("frame pool allocation failed"))?;

        for _ in 0..pool_num {
            free_list.push(Arc::new(Frame::new()));
        }

        Ok(Self {
            free_list,
            pool_num,
        })
    }

    /// Hands out an unused frame, or None when the pool is exhausted.
    /// The returned frame has `pin_count == 0` and stale data.
    pub fn alloc(&mut self) -> Option<Arc<Frame>> {
        self.free_list.pop()
    }

    /// Takes a frame back into the pool. The caller must have dropped every
    /// pin first.
    pub fn free(&mut self, frame: Arc<Frame>) {
        assert_eq!(
            frame.pin_count(),
            0,
            "freed a frame that is still pinned: {:?}",
            frame
        );
        frame.reset();
        debug_assert!(self.free_list.len() < self.pool_num);
        self.free_list.push(frame);
    }

    /// Total pool capacity.
    pub fn pool_num(&self) -> usize {
        self.pool_num
    }

    /// Number of frames currently sitting on the free list.
    pub fn free_count(&self) -> usize {
        self.free_list.len()
    }
}
