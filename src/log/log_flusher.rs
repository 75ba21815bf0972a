use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use tracing::warn;

use super::log_manager::LogInner;

/// LogFlusher runs a background worker that drains the log buffer to the
/// log file whenever the high-water mark wakes it. It never fsyncs on its
/// own; durability stays with `LogManager::sync` on the commit path. The
/// daemon only bounds buffer growth between commits.
pub(crate) struct LogFlusher {
    /// Channel used to wake the worker
    wake_sender: Sender<()>,
    /// Flag to signal shutdown
    shutdown: Arc<AtomicBool>,
    /// Handle to the background worker thread
    worker_handle: Option<JoinHandle<()>>,
}

impl LogFlusher {
    /// Spawns the worker over the shared buffer/file state.
    pub(crate) fn new(inner: Arc<Mutex<LogInner>>) -> Self {
        let (wake_sender, wake_receiver) = bounded::<()>(16);
        let shutdown = Arc::new(AtomicBool::new(false));

        let shutdown_clone = Arc::clone(&shutdown);
        let worker_handle = thread::spawn(move || {
            Self::run_worker(inner, wake_receiver, shutdown_clone);
        });

        Self {
            wake_sender,
            shutdown,
            worker_handle: Some(worker_handle),
        }
    }

    /// Wakes the worker. Dropping the wake-up when the channel is full is
    /// fine: a flush is already pending.
    pub(crate) fn wake(&self) {
        let _ = self.wake_sender.try_send(());
    }

    fn run_worker(
        inner: Arc<Mutex<LogInner>>,
        wake_receiver: Receiver<()>,
        shutdown: Arc<AtomicBool>,
    ) {
        loop {
            if shutdown.load(Ordering::Relaxed) {
                // Drain pending wake-ups, then leave whatever the final
                // flush below can still save.
                while wake_receiver.try_recv().is_ok() {}
                Self::flush(&inner, true);
                break;
            }

            match wake_receiver.recv_timeout(Duration::from_millis(100)) {
                Ok(()) => Self::flush(&inner, false),
                Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                    // Continue loop, check shutdown flag
                }
                Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
            }
        }
    }

    fn flush(inner: &Mutex<LogInner>, final_flush: bool) {
        let mut inner = inner.lock();
        let LogInner { buffer, file } = &mut *inner;
        if let Err(err) = buffer.flush_buffer(file) {
            warn!(%err, "background log flush failed");
            return;
        }
        if final_flush {
            if let Err(err) = file.sync() {
                warn!(%err, "log sync on shutdown failed");
            }
        }
    }
}

impl Drop for LogFlusher {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.worker_handle.take() {
            let _ = handle.join();
        }
    }
}
