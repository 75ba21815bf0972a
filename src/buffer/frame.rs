use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use parking_lot::{
    MappedRwLockReadGuard, MappedRwLockWriteGuard, Mutex, RwLock, RwLockReadGuard,
    RwLockWriteGuard,
};

use crate::common::{FrameId, PageNum, PAGE_SIZE};

/// Frame is one slot of the physical pool: a page-sized buffer together
/// with the identity of the page it holds, a pin count and a dirty bit.
///
/// Identity changes only while the frame manager holds its mutex. Pins and
/// the dirty bit are atomics, so a holder can release its claim or flag a
/// modification without going back through the manager.
pub struct Frame {
    /// Which page this frame currently holds. Stale while the frame sits
    /// on the free list.
    frame_id: Mutex<FrameId>,
    /// Outstanding claims; a non-zero count blocks eviction
    pins: AtomicU32,
    /// Set when the buffered page diverges from its on-disk copy
    dirty: AtomicBool,
    /// The page bytes themselves
    data: RwLock<Box<[u8; PAGE_SIZE]>>,
}

impl Frame {
    pub(crate) fn new() -> Self {
        Self {
            frame_id: Mutex::new(FrameId::new(-1, 0)),
            pins: AtomicU32::new(0),
            dirty: AtomicBool::new(false),
            data: RwLock::new(Box::new([0u8; PAGE_SIZE])),
        }
    }

    pub fn frame_id(&self) -> FrameId {
        *self.frame_id.lock()
    }

    pub fn file_desc(&self) -> i32 {
        self.frame_id.lock().file_desc()
    }

    pub fn page_num(&self) -> PageNum {
        self.frame_id.lock().page_num()
    }

    /// Rebinds the frame to a page. Only the frame manager does this,
    /// under its mutex.
    pub(crate) fn set_frame_id(&self, frame_id: FrameId) {
        *self.frame_id.lock() = frame_id;
    }

    /// Takes one claim on the frame. Returns the claim count including
    /// this one.
    pub fn pin(&self) -> u32 {
        let previous = self.pins.fetch_add(1, Ordering::AcqRel);
        previous + 1
    }

    /// Releases one claim. Yields the count left after the release, or
    /// None when there was no claim to drop.
    pub fn unpin(&self) -> Option<u32> {
        self.pins
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
                count.checked_sub(1)
            })
            .ok()
            .map(|previous| previous - 1)
    }

    pub fn pin_count(&self) -> u32 {
        self.pins.load(Ordering::Acquire)
    }

    /// Eviction is allowed once every claim has been released.
    pub fn can_evict(&self) -> bool {
        self.pin_count() == 0
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Flags whether the buffered page still matches its on-disk copy.
    pub fn set_dirty(&self, dirty: bool) {
        self.dirty.store(dirty, Ordering::Release);
    }

    /// Shared view of the page bytes.
    pub fn page_data(&self) -> MappedRwLockReadGuard<'_, [u8]> {
        RwLockReadGuard::map(self.data.read(), |page| &page[..])
    }

    /// Exclusive view of the page bytes. A holder that mutates through
    /// this guard is responsible for calling `set_dirty`.
    pub fn page_data_mut(&self) -> MappedRwLockWriteGuard<'_, [u8]> {
        RwLockWriteGuard::map(self.data.write(), |page| &mut page[..])
    }

    /// Scrubs the frame on its way back to the free list. The next
    /// allocation overwrites the identity.
    pub(crate) fn reset(&self) {
        self.data.write().fill(0);
        self.pins.store(0, Ordering::Release);
        self.dirty.store(false, Ordering::Release);
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("frame_id", &self.frame_id())
            .field("pin_count", &self.pin_count())
            .field("dirty", &self.is_dirty())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_new() {
        let frame = Frame::new();
        assert_eq!(frame.pin_count(), 0);
        assert!(!frame.is_dirty());
        assert!(frame.can_evict());
    }

    #[test]
    fn test_frame_pin_unpin() {
        let frame = Frame::new();

        assert_eq!(frame.pin(), 1);
        assert_eq!(frame.pin(), 2);
        assert_eq!(frame.pin_count(), 2);
        assert!(!frame.can_evict());

        assert_eq!(frame.unpin(), Some(1));
        assert_eq!(frame.unpin(), Some(0));
        assert_eq!(frame.unpin(), None);
        assert!(frame.can_evict());
    }

    #[test]
    fn test_frame_identity() {
        let frame = Frame::new();
        frame.set_frame_id(FrameId::new(5, 12));
        assert_eq!(frame.frame_id(), FrameId::new(5, 12));
        assert_eq!(frame.file_desc(), 5);
        assert_eq!(frame.page_num(), 12);
    }

    #[test]
    fn test_frame_dirty() {
        let frame = Frame::new();

        assert!(!frame.is_dirty());
        frame.set_dirty(true);
        assert!(frame.is_dirty());
        frame.set_dirty(false);
        assert!(!frame.is_dirty());
    }

    #[test]
    fn test_frame_page_data_guards() {
        let frame = Frame::new();

        {
            let mut page = frame.page_data_mut();
            page[0] = 42;
            page[PAGE_SIZE - 1] = 255;
        }

        let page = frame.page_data();
        assert_eq!(page.len(), PAGE_SIZE);
        assert_eq!(page[0], 42);
        assert_eq!(page[PAGE_SIZE - 1], 255);
    }

    #[test]
    fn test_frame_reset() {
        let frame = Frame::new();
        frame.pin();
        frame.set_dirty(true);
        frame.page_data_mut().fill(7);

        frame.reset();

        assert_eq!(frame.pin_count(), 0);
        assert!(!frame.is_dirty());
        assert!(frame.page_data().iter().all(|&byte| byte == 0));
    }

    #[test]
    fn test_frame_concurrent_pins() {
        use std::sync::Arc;
        use std::thread;

        let frame = Arc::new(Frame::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let frame = Arc::clone(&frame);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        frame.pin();
                        frame.unpin().unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(frame.pin_count(), 0);
    }
}
