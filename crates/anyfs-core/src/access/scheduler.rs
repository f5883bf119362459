//! Write-biased reader/writer scheduling for one filesystem instance.
//!
//! The scheduler is an explicit state machine over four collections:
//!
//! - the set of active readers,
//! - at most one active writer,
//! - a FIFO queue of waiting writers,
//! - an unordered set of waiting readers.
//!
//! Waiters suspend on a `oneshot` channel and are woken by the release that
//! makes their grant possible. The state lives behind a synchronous mutex that
//! is never held across an `.await`.
//!
//! # Rules
//!
//! - A reader is granted immediately only when no writer is active *and* no
//!   writer is queued, so a queued writer is never overtaken by a later reader.
//! - A writer always joins the queue; the queue head starts as soon as there
//!   are no active readers and no active writer.
//! - When a writer releases, every waiting reader is promoted at once. The
//!   next writer only starts when that batch drains, or immediately if the
//!   batch was empty.

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;
use tracing::trace;

/// Kind of access a guard grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessMode {
    Read,
    Write,
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessMode::Read => write!(f, "read"),
            AccessMode::Write => write!(f, "write"),
        }
    }
}

/// Point-in-time view of the scheduler, for diagnostics and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerSnapshot {
    pub active_readers: usize,
    pub writer_active: bool,
    pub queued_writers: usize,
    pub waiting_readers: usize,
}

impl SchedulerSnapshot {
    /// Whether nothing is active or waiting.
    pub fn is_idle(&self) -> bool {
        *self == Self::default()
    }
}

struct Waiter {
    id: u64,
    wake: oneshot::Sender<()>,
}

#[derive(Default)]
struct SchedulerState {
    next_id: u64,
    active_readers: HashSet<u64>,
    active_writer: Option<u64>,
    writer_queue: VecDeque<Waiter>,
    waiting_readers: Vec<Waiter>,
}

impl SchedulerState {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Start the queue head if nothing blocks it.
    fn start_next_writer(&mut self) -> bool {
        if self.active_writer.is_some() || !self.active_readers.is_empty() {
            return false;
        }
        let Some(next) = self.writer_queue.pop_front() else {
            return false;
        };
        self.active_writer = Some(next.id);
        trace!(guard = next.id, "Write access granted from queue");
        // A dropped receiver means the acquire was cancelled; its guard
        // releases this id as soon as the cancelled future finishes dropping.
        let _ = next.wake.send(());
        true
    }

    /// Move every waiting reader into the active set. Returns how many moved.
    fn promote_waiting_readers(&mut self) -> usize {
        let promoted = self.waiting_readers.len();
        for waiter in self.waiting_readers.drain(..) {
            self.active_readers.insert(waiter.id);
            let _ = waiter.wake.send(());
        }
        if promoted > 0 {
            trace!(promoted, "Read access granted to waiting readers");
        }
        promoted
    }

    /// Restore progress after a waiter left without ever being granted.
    fn dispatch_after_cancel(&mut self) {
        if self.active_writer.is_some() || self.start_next_writer() {
            return;
        }
        if self.writer_queue.is_empty() {
            self.promote_waiting_readers();
        }
    }

    fn release(&mut self, id: u64, mode: AccessMode) {
        match mode {
            AccessMode::Read => {
                if self.active_readers.remove(&id) {
                    trace!(guard = id, "Read access released");
                    if self.active_readers.is_empty() {
                        self.start_next_writer();
                    }
                } else {
                    self.waiting_readers.retain(|w| w.id != id);
                    trace!(guard = id, "Cancelled waiting reader");
                }
            }
            AccessMode::Write => {
                if self.active_writer == Some(id) {
                    self.active_writer = None;
                    trace!(guard = id, "Write access released");
                    if self.promote_waiting_readers() == 0 {
                        self.start_next_writer();
                    }
                } else {
                    self.writer_queue.retain(|w| w.id != id);
                    trace!(guard = id, "Cancelled queued writer");
                    self.dispatch_after_cancel();
                }
            }
        }
    }

    fn snapshot(&self) -> SchedulerSnapshot {
        SchedulerSnapshot {
            active_readers: self.active_readers.len(),
            writer_active: self.active_writer.is_some(),
            queued_writers: self.writer_queue.len(),
            waiting_readers: self.waiting_readers.len(),
        }
    }
}

/// Arbitrates shared read access and exclusive write access to the whole
/// object graph of one filesystem instance.
///
/// # Thread Safety
///
/// `AccessScheduler` is `Send + Sync` and is shared through `Arc`. Acquire
/// futures are cancel-safe: dropping one while it waits removes its request,
/// and dropping one after its grant releases the grant.
#[derive(Default)]
pub struct AccessScheduler {
    state: Mutex<SchedulerState>,
}

impl AccessScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SchedulerState> {
        // No code path panics while holding the lock, but a poisoned state is
        // still consistent because every transition completes before unlock.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Acquire shared read access.
    ///
    /// Waits while a writer is active or queued.
    pub async fn acquire_read(self: &Arc<Self>) -> AccessGuard {
        let (guard, pending) = {
            let mut state = self.lock();
            let id = state.allocate_id();
            let guard = AccessGuard::new(id, AccessMode::Read, Arc::clone(self));
            if state.active_writer.is_none() && state.writer_queue.is_empty() {
                state.active_readers.insert(id);
                trace!(guard = id, "Read access granted immediately");
                (guard, None)
            } else {
                let (wake, wait) = oneshot::channel();
                state.waiting_readers.push(Waiter { id, wake });
                trace!(guard = id, "Reader waiting behind writer");
                (guard, Some(wait))
            }
        };

        if let Some(wait) = pending {
            // The sender is only dropped unsent when this request is removed,
            // which requires dropping `guard` first.
            let _ = wait.await;
        }
        guard
    }

    /// Acquire exclusive write access.
    ///
    /// Writers are served in request order.
    pub async fn acquire_write(self: &Arc<Self>) -> AccessGuard {
        let (guard, wait) = {
            let mut state = self.lock();
            let id = state.allocate_id();
            let guard = AccessGuard::new(id, AccessMode::Write, Arc::clone(self));
            let (wake, wait) = oneshot::channel();
            state.writer_queue.push_back(Waiter { id, wake });
            trace!(
                guard = id,
                queued = state.writer_queue.len(),
                "Writer enqueued"
            );
            state.start_next_writer();
            (guard, wait)
        };

        let _ = wait.await;
        guard
    }

    /// Current counts of active and waiting requests.
    pub fn snapshot(&self) -> SchedulerSnapshot {
        self.lock().snapshot()
    }

    fn release(&self, id: u64, mode: AccessMode) {
        self.lock().release(id, mode);
    }
}

impl fmt::Debug for AccessScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessScheduler")
            .field("state", &self.snapshot())
            .finish()
    }
}

/// RAII grant of read or write access.
///
/// Dropping the guard releases the access (or withdraws the request if it was
/// never granted).
#[must_use = "access is released as soon as the guard is dropped"]
pub struct AccessGuard {
    id: u64,
    mode: AccessMode,
    scheduler: Arc<AccessScheduler>,
}

impl AccessGuard {
    fn new(id: u64, mode: AccessMode, scheduler: Arc<AccessScheduler>) -> Self {
        Self {
            id,
            mode,
            scheduler,
        }
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }
}

impl Drop for AccessGuard {
    fn drop(&mut self) {
        self.scheduler.release(self.id, self.mode);
    }
}

impl fmt::Debug for AccessGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessGuard")
            .field("id", &self.id)
            .field("mode", &self.mode)
            .finish()
    }
}
