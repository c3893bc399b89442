use crate::foundation::config::DisposerConfig;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

/// A native resource release routine.
pub trait DisposerRecord: Send + 'static {
    fn dispose(&mut self);

    /// Whether the record may be released inline by [`Disposer::poll_removed`] on the polling
    /// thread. Other records are deferred to the background thread.
    fn poll_safe(&self) -> bool {
        false
    }
}

/// Release routine backed by a plain function pointer and an opaque token.
pub struct NativeRecord {
    dispose_fn: fn(u64),
    token: u64,
    poll_safe: bool,
}

impl NativeRecord {
    pub fn new(dispose_fn: fn(u64), token: u64) -> Self {
        Self {
            dispose_fn,
            token,
            poll_safe: false,
        }
    }

    pub fn poll_safe(mut self) -> Self {
        self.poll_safe = true;
        self
    }
}

impl DisposerRecord for NativeRecord {
    fn dispose(&mut self) {
        (self.dispose_fn)(self.token);
    }

    fn poll_safe(&self) -> bool {
        self.poll_safe
    }
}

enum Message {
    Reclaimed(Box<dyn DisposerRecord>),
    Shutdown,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PollStats {
    pub reclaimed: usize,
    pub disposed_inline: usize,
    pub deferred: usize,
}

struct Shared {
    deferred: Mutex<VecDeque<Box<dyn DisposerRecord>>>,
    disposed: AtomicU64,
}

impl Shared {
    fn dispose(&self, mut record: Box<dyn DisposerRecord>) {
        record.dispose();
        self.disposed.fetch_add(1, Ordering::Relaxed);
    }

    fn drain_deferred(&self) {
        loop {
            let next = self.deferred.lock().pop_front();
            match next {
                Some(record) => self.dispose(record),
                None => break,
            }
        }
    }
}

/// Releases native resources after their owning objects are dropped.
///
/// Dropping a [`DisposerHandle`] enqueues its record. Records are released exactly once,
/// either by the background thread or inline by [`Self::poll_removed`].
pub struct Disposer {
    config: DisposerConfig,
    tx: Sender<Message>,
    rx: Receiver<Message>,
    shared: Arc<Shared>,
    polling: AtomicBool,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl fmt::Debug for Disposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disposer")
            .field("config", &self.config)
            .field("queued", &self.rx.len())
            .field("deferred", &self.pending_deferred())
            .field("disposed", &self.disposed())
            .finish()
    }
}

impl Disposer {
    pub fn new(config: DisposerConfig) -> Arc<Self> {
        let (tx, rx) = crossbeam_channel::unbounded();
        Arc::new(Self {
            config,
            tx,
            rx,
            shared: Arc::new(Shared {
                deferred: Mutex::new(VecDeque::new()),
                disposed: AtomicU64::new(0),
            }),
            polling: AtomicBool::new(false),
            worker: Mutex::new(None),
        })
    }

    /// Register a record. It is released once the returned handle drops.
    pub fn register(&self, record: impl DisposerRecord) -> DisposerHandle {
        DisposerHandle {
            record: Some(Box::new(record)),
            tx: self.tx.clone(),
        }
    }

    /// Start the background release thread. Idempotent.
    pub fn start(&self) -> std::io::Result<()> {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            return Ok(());
        }
        let rx = self.rx.clone();
        let shared = Arc::clone(&self.shared);
        let handle = std::thread::Builder::new()
            .name("gfxpipe-disposer".to_string())
            .spawn(move || {
                loop {
                    match rx.recv_timeout(Duration::from_millis(50)) {
                        Ok(Message::Reclaimed(record)) => shared.dispose(record),
                        Ok(Message::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
                        Err(RecvTimeoutError::Timeout) => {}
                    }
                    shared.drain_deferred();
                }
                shared.drain_deferred();
            })?;
        *worker = Some(handle);
        tracing::debug!("disposer thread started");
        Ok(())
    }

    /// Stop the background thread after it releases everything already deferred.
    pub fn shutdown(&self) {
        let Some(handle) = self.worker.lock().take() else {
            return;
        };
        let _ = self.tx.send(Message::Shutdown);
        if handle.join().is_err() {
            tracing::warn!("disposer thread panicked");
        }
    }

    /// Release reclaimed records on the calling thread.
    ///
    /// Stops after `max_reclaimed_per_poll` reclaimed entries or `max_deferred_per_poll`
    /// deferred ones. Records that are not poll-safe are queued for the background thread.
    /// Reentrant calls return immediately.
    pub fn poll_removed(&self) -> PollStats {
        let mut stats = PollStats::default();
        if self.polling.swap(true, Ordering::AcqRel) {
            return stats;
        }
        while stats.reclaimed < self.config.max_reclaimed_per_poll
            && stats.deferred < self.config.max_deferred_per_poll
        {
            match self.rx.try_recv() {
                Ok(Message::Reclaimed(record)) => {
                    stats.reclaimed += 1;
                    if record.poll_safe() {
                        self.shared.dispose(record);
                        stats.disposed_inline += 1;
                    } else {
                        self.shared.deferred.lock().push_back(record);
                        stats.deferred += 1;
                    }
                }
                Ok(Message::Shutdown) => {
                    // Not ours; hand it back to the worker.
                    let _ = self.tx.send(Message::Shutdown);
                    break;
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        self.polling.store(false, Ordering::Release);
        if stats.reclaimed > 0 {
            tracing::trace!(?stats, "disposer poll");
        }
        stats
    }

    /// Release every deferred record on the calling thread.
    pub fn flush_deferred(&self) {
        self.shared.drain_deferred();
    }

    pub fn pending_deferred(&self) -> usize {
        self.shared.deferred.lock().len()
    }

    /// Total records released so far.
    pub fn disposed(&self) -> u64 {
        self.shared.disposed.load(Ordering::Relaxed)
    }
}

impl Drop for Disposer {
    fn drop(&mut self) {
        self.shutdown();
        // nothing polls once the disposer is gone; release what is still queued
        let mut released = 0usize;
        while let Ok(message) = self.rx.try_recv() {
            if let Message::Reclaimed(record) = message {
                self.shared.dispose(record);
                released += 1;
            }
        }
        self.shared.drain_deferred();
        if released > 0 {
            tracing::debug!(released, "disposer dropped with queued records");
        }
    }
}

/// Ownership token for a registered record. Dropping it schedules the release.
pub struct DisposerHandle {
    record: Option<Box<dyn DisposerRecord>>,
    tx: Sender<Message>,
}

impl fmt::Debug for DisposerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisposerHandle")
            .field("armed", &self.record.is_some())
            .finish()
    }
}

impl Drop for DisposerHandle {
    fn drop(&mut self) {
        if let Some(record) = self.record.take()
            && let Err(err) = self.tx.send(Message::Reclaimed(record))
        {
            // Disposer is gone; release here rather than leak.
            if let Message::Reclaimed(mut record) = err.into_inner() {
                record.dispose();
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/surface/disposer.rs"]
mod tests;
