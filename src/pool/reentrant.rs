use crossbeam_channel::{Receiver, Sender, TryRecvError};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use thread_local::ThreadLocal;

/// Where a pool keeps its primary per-thread instance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolStrategy {
    /// One parked instance per thread, plus the shared queue for reentrant acquisitions.
    #[default]
    ThreadLocal,
    /// Shared queue only.
    Queue,
}

/// How strongly parked instances are retained.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefStrength {
    /// Never evicted.
    #[default]
    Hard,
    /// Evicted under critical memory pressure.
    Soft,
    /// Evicted under any memory pressure.
    Weak,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MemoryPressure {
    Moderate,
    Critical,
}

/// Which storage an acquired instance came from and must return to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Usage {
    ThreadLocal,
    Queue,
}

/// Scratch state held by a [`ReentrantContextPool`].
pub trait ReentrantContext: Send + 'static {
    /// Clear per-use state before the instance is parked again.
    fn reset(&mut self) {}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub created: u64,
    pub reused: u64,
    pub evicted: u64,
}

struct Entry<T> {
    ctx: Box<T>,
    generation: u64,
}

enum LocalSlot<T> {
    Empty,
    Parked(Entry<T>),
    InUse,
}

/// Pool of scratch contexts that can be re-acquired while already held on the same thread.
///
/// Under [`PoolStrategy::ThreadLocal`] the first acquisition on a thread takes the thread's
/// parked instance; nested acquisitions fall through to the shared queue. Acquisition never
/// blocks: an empty queue creates a fresh instance.
pub struct ReentrantContextPool<T: ReentrantContext> {
    strategy: PoolStrategy,
    strength: RefStrength,
    factory: Box<dyn Fn() -> T + Send + Sync>,
    local: ThreadLocal<RefCell<LocalSlot<T>>>,
    queue_tx: Sender<Entry<T>>,
    queue_rx: Receiver<Entry<T>>,
    generation: AtomicU64,
    created: AtomicU64,
    reused: AtomicU64,
    evicted: AtomicU64,
}

impl<T: ReentrantContext> fmt::Debug for ReentrantContextPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReentrantContextPool")
            .field("strategy", &self.strategy)
            .field("strength", &self.strength)
            .field("queued", &self.queue_rx.len())
            .field("stats", &self.stats())
            .finish()
    }
}

impl<T: ReentrantContext> ReentrantContextPool<T> {
    pub fn new(
        strategy: PoolStrategy,
        strength: RefStrength,
        factory: impl Fn() -> T + Send + Sync + 'static,
    ) -> Self {
        let (queue_tx, queue_rx) = crossbeam_channel::unbounded();
        Self {
            strategy,
            strength,
            factory: Box::new(factory),
            local: ThreadLocal::new(),
            queue_tx,
            queue_rx,
            generation: AtomicU64::new(0),
            created: AtomicU64::new(0),
            reused: AtomicU64::new(0),
            evicted: AtomicU64::new(0),
        }
    }

    pub fn strategy(&self) -> PoolStrategy {
        self.strategy
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            created: self.created.load(Ordering::Relaxed),
            reused: self.reused.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
        }
    }

    /// Number of instances parked in the shared queue.
    pub fn queued(&self) -> usize {
        self.queue_rx.len()
    }

    pub fn acquire(&self) -> PooledContext<'_, T> {
        if self.strategy == PoolStrategy::ThreadLocal
            && let Some(ctx) = self.acquire_local()
        {
            return PooledContext {
                pool: self,
                ctx: Some(ctx),
                usage: Usage::ThreadLocal,
            };
        }
        PooledContext {
            pool: self,
            ctx: Some(self.acquire_queued()),
            usage: Usage::Queue,
        }
    }

    /// Return an instance early. Dropping the guard does the same.
    pub fn release(&self, ctx: PooledContext<'_, T>) {
        drop(ctx);
    }

    /// React to a memory-pressure signal by invalidating parked instances the pool's
    /// retention strength allows it to drop.
    pub fn on_memory_pressure(&self, level: MemoryPressure) {
        let evict = match (self.strength, level) {
            (RefStrength::Hard, _) => false,
            (RefStrength::Soft, MemoryPressure::Moderate) => false,
            (RefStrength::Soft, MemoryPressure::Critical) => true,
            (RefStrength::Weak, _) => true,
        };
        if evict {
            self.generation.fetch_add(1, Ordering::AcqRel);
            tracing::debug!(strength = ?self.strength, ?level, "evicting pooled contexts");
        }
    }

    fn is_live(&self, entry: &Entry<T>) -> bool {
        entry.generation == self.generation.load(Ordering::Acquire)
    }

    fn create(&self) -> Box<T> {
        self.created.fetch_add(1, Ordering::Relaxed);
        Box::new((self.factory)())
    }

    // `None` when this thread's primary instance is already in use.
    fn acquire_local(&self) -> Option<Box<T>> {
        let cell = self.local.get_or(|| RefCell::new(LocalSlot::Empty));
        let mut slot = cell.borrow_mut();
        match std::mem::replace(&mut *slot, LocalSlot::InUse) {
            LocalSlot::InUse => None,
            LocalSlot::Parked(entry) if self.is_live(&entry) => {
                self.reused.fetch_add(1, Ordering::Relaxed);
                Some(entry.ctx)
            }
            LocalSlot::Parked(_) => {
                self.evicted.fetch_add(1, Ordering::Relaxed);
                Some(self.create())
            }
            LocalSlot::Empty => Some(self.create()),
        }
    }

    fn acquire_queued(&self) -> Box<T> {
        loop {
            match self.queue_rx.try_recv() {
                Ok(entry) if self.is_live(&entry) => {
                    self.reused.fetch_add(1, Ordering::Relaxed);
                    return entry.ctx;
                }
                Ok(_) => {
                    self.evicted.fetch_add(1, Ordering::Relaxed);
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return self.create(),
            }
        }
    }

    fn put_back(&self, mut ctx: Box<T>, usage: Usage) {
        ctx.reset();
        let entry = Entry {
            ctx,
            generation: self.generation.load(Ordering::Acquire),
        };
        if usage == Usage::ThreadLocal {
            let cell = self.local.get_or(|| RefCell::new(LocalSlot::Empty));
            let mut slot = cell.borrow_mut();
            if matches!(*slot, LocalSlot::InUse) {
                *slot = LocalSlot::Parked(entry);
                return;
            }
            drop(slot);
            // Released on a thread whose primary slot is not waiting for it.
            let _ = self.queue_tx.send(entry);
            return;
        }
        let _ = self.queue_tx.send(entry);
    }
}

/// An acquired pool instance. Returns to its origin on drop.
pub struct PooledContext<'a, T: ReentrantContext> {
    pool: &'a ReentrantContextPool<T>,
    ctx: Option<Box<T>>,
    usage: Usage,
}

impl<T: ReentrantContext> PooledContext<'_, T> {
    pub fn usage(&self) -> Usage {
        self.usage
    }
}

impl<T: ReentrantContext> Deref for PooledContext<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        match self.ctx.as_deref() {
            Some(ctx) => ctx,
            None => unreachable!("pooled context accessed after release"),
        }
    }
}

impl<T: ReentrantContext> DerefMut for PooledContext<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        match self.ctx.as_deref_mut() {
            Some(ctx) => ctx,
            None => unreachable!("pooled context accessed after release"),
        }
    }
}

impl<T: ReentrantContext> Drop for PooledContext<'_, T> {
    fn drop(&mut self) {
        if let Some(ctx) = self.ctx.take() {
            self.pool.put_back(ctx, self.usage);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pool/reentrant.rs"]
mod tests;
