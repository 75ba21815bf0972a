use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::common::{FrameId, PageNum, Result, StratumError};

use super::{Frame, FrameAllocator, FrameCache};

/// State guarded by the frame manager's mutex. Cache and allocator move
/// together: a frame is either resident (in the cache) or on the free list,
/// never both, and only transitions while the mutex is held.
struct FrameManagerInner {
    cache: FrameCache,
    allocator: FrameAllocator,
}

/// FrameManager is the concurrent facade over the frame pool. It coordinates
/// identity lookup, allocation, pinning and eviction for page frames shared
/// across multiple open files.
///
/// One mutex serializes every public operation for its entire duration.
/// Nothing suspends while the mutex is held; the only foreign code run under
/// it is the `evict_action` callback, which therefore must not call back
/// into the frame manager on the same thread.
///
/// Pinning discipline: `alloc` and `get` return frames with one additional
/// pin held for the caller. A holder releases that claim with `free` (last
/// holder, removes residency) or `Frame::unpin` (keeps the frame resident
/// and eligible for eviction once the count reaches zero).
pub struct FrameManager {
    inner: Mutex<FrameManagerInner>,
}

impl FrameManager {
    /// Creates a frame manager over a preallocated pool of `pool_num`
    /// frames. Fails with `NoMem` when the pool cannot be allocated.
    pub fn new(pool_num: usize) -> Result<Self> {
        let allocator = FrameAllocator::new(pool_num)?;
        Ok(Self {
            inner: Mutex::new(FrameManagerInner {
                cache: FrameCache::new(),
                allocator,
            }),
        })
    }

    /// Tears the manager down. Every frame must have been freed first;
    /// residual residency is a leak and reported as `Internal`.
    pub fn cleanup(&self) -> Result<()> {
        let inner = self.inner.lock();
        if !inner.cache.is_empty() {
            return Err(StratumError::Internal(format!(
                "cleanup with {} frame(s) still resident",
                inner.cache.len()
            )));
        }
        Ok(())
    }

    /// Returns the frame for `(file_desc, page_num)`, pinned for the caller.
    ///
    /// If the page is already resident this is equivalent to `get`.
    /// Otherwise a frame is taken from the pool, assigned the identity and
    /// inserted into the cache. Returns None when the pool is exhausted;
    /// callers are expected to run `evict_frames` and retry.
    pub fn alloc(&self, file_desc: i32, page_num: PageNum) -> Option<Arc<Frame>> {
        let frame_id = FrameId::new(file_desc, page_num);
        let mut inner = self.inner.lock();

        if let Some(frame) = inner.cache.get(&frame_id) {
            frame.pin();
            return Some(frame);
        }

        let frame = inner.allocator.alloc()?;
        assert_eq!(
            frame.pin_count(),
            0,
            "allocator handed out a pinned frame: {:?}",
            frame
        );
        frame.set_frame_id(frame_id);
        frame.pin();
        inner.cache.put(frame_id, Arc::clone(&frame));
        Some(frame)
    }

    /// Returns the resident frame for `(file_desc, page_num)`, pinned for
    /// the caller, or None if the page is not resident. Never allocates.
    pub fn get(&self, file_desc: i32, page_num: PageNum) -> Option<Arc<Frame>> {
        let frame_id = FrameId::new(file_desc, page_num);
        let mut inner = self.inner.lock();

        let frame = inner.cache.get(&frame_id)?;
        frame.pin();
        Some(frame)
    }

    /// Releases the last pin on a frame and returns it to the pool.
    ///
    /// The caller must hold the only outstanding pin (`pin_count == 1`) and
    /// `frame` must be the resident entry for the identity. Violations are
    /// programmer errors and assert.
    pub fn free(&self, file_desc: i32, page_num: PageNum, frame: &Arc<Frame>) -> Result<()> {
        let frame_id = FrameId::new(file_desc, page_num);
        let mut inner = self.inner.lock();

        let resident = inner.cache.get(&frame_id);
        assert!(
            resident
                .as_ref()
                .map(|r| Arc::ptr_eq(r, frame))
                .unwrap_or(false),
            "freeing a frame that is not the resident entry for {}",
            frame_id
        );
        assert_eq!(
            frame.pin_count(),
            1,
            "freeing {} while other pins are outstanding",
            frame_id
        );

        let _ = frame.unpin();
        let frame = inner.cache.remove(&frame_id).unwrap();
        inner.allocator.free(frame);
        Ok(())
    }

    /// Pins and returns every resident frame belonging to `file_desc`.
    /// Used when a file is being flushed or closed.
    pub fn find_list(&self, file_desc: i32) -> Vec<Arc<Frame>> {
        let mut inner = self.inner.lock();

        let mut frames = Vec::new();
        inner.cache.foreach(|_, frame_id, frame| {
            if frame_id.file_desc() == file_desc {
                frame.pin();
                frames.push(frame);
            }
            true
        });
        frames
    }

    /// Evicts up to `count` unpinned frames, coldest first.
    ///
    /// `evict_action` runs under the manager's mutex and is expected to
    /// resolve the frame's dirty state (typically by flushing it to disk).
    /// It must not re-enter the frame manager. If the action fails the
    /// frame stays resident and the walk continues with the next candidate.
    ///
    /// Returns the number of frames actually evicted.
    pub fn evict_frames<F>(&self, count: usize, mut evict_action: F) -> usize
    where
        F: FnMut(&Frame) -> Result<()>,
    {
        let mut inner = self.inner.lock();
        let FrameManagerInner { cache, allocator } = &mut *inner;

        let mut evicted = 0;
        cache.foreach(|cache, frame_id, frame| {
            if frame.can_evict() {
                match evict_action(&frame) {
                    Ok(()) => {
                        let frame = cache.remove(&frame_id).unwrap();
                        allocator.free(frame);
                        evicted += 1;
                    }
                    Err(err) => {
                        debug!(%frame_id, %err, "evict action failed, frame stays resident");
                    }
                }
            }
            evicted < count
        });

        evicted
    }

    /// Total pool capacity.
    pub fn pool_num(&self) -> usize {
        self.inner.lock().allocator.pool_num()
    }

    /// Number of frames currently resident in the cache.
    pub fn resident_count(&self) -> usize {
        self.inner.lock().cache.len()
    }

    /// Number of frames sitting on the free list.
    pub fn free_frame_count(&self) -> usize {
        self.inner.lock().allocator.free_count()
    }
}
