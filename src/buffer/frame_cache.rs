use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::common::FrameId;

use super::Frame;

/// FrameCache maps resident page identities to their frames and keeps a
/// least-recently-used ordering over them. `foreach` walks frames coldest
/// first, which is the eviction-candidate order.
///
/// Like the allocator, the cache carries no locking of its own; the frame
/// manager serializes access.
pub struct FrameCache {
    frames: HashMap<FrameId, Arc<Frame>>,
    /// LRU order: front is the coldest entry, back the most recently used
    lru: VecDeque<FrameId>,
}

impl FrameCache {
    pub fn new() -> Self {
        Self {
            frames: HashMap::new(),
            lru: VecDeque::new(),
        }
    }

    /// Looks up a resident frame and promotes it to most-recently-used.
    pub fn get(&mut self, frame_id: &FrameId) -> Option<Arc<Frame>> {
        let frame = self.frames.get(frame_id)?;
        let frame = Arc::clone(frame);
        self.touch(frame_id);
        Some(frame)
    }

    /// Inserts a frame as the most-recently-used entry.
    pub fn put(&mut self, frame_id: FrameId, frame: Arc<Frame>) {
        if self.frames.insert(frame_id, frame).is_none() {
            self.lru.push_back(frame_id);
        } else {
            self.touch(&frame_id);
        }
    }

    /// Removes an entry, returning the frame if it was resident.
    pub fn remove(&mut self, frame_id: &FrameId) -> Option<Arc<Frame>> {
        let frame = self.frames.remove(frame_id)?;
        if let Some(pos) = self.lru.iter().position(|id| id == frame_id) {
            self.lru.remove(pos);
        }
        Some(frame)
    }

    /// Visits resident frames in eviction-candidate order (coldest first).
    /// The visitor returns `true` to keep going, `false` to stop early.
    /// The visitor may remove the entry it was handed.
    pub fn foreach<F>(&mut self, mut visitor: F)
    where
        F: FnMut(&mut Self, FrameId, Arc<Frame>) -> bool,
    {
        let order: Vec<FrameId> = self.lru.iter().copied().collect();
        for frame_id in order {
            // Entries can disappear while we walk the snapshot.
            let frame = match self.frames.get(&frame_id) {
                Some(frame) => Arc::clone(frame),
                None => continue,
            };
            if !visitor(self, frame_id, frame) {
                break;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    fn touch(&mut self, frame_id: &FrameId) {
        if let Some(pos) = self.lru.iter().position(|id| id == frame_id) {
            self.lru.remove(pos);
            self.lru.push_back(*frame_id);
        }
    }
}

impl Default for FrameCache {
    fn default() -> Self {
        Self::new()
    }
}
