//! Bounded work queue with completion protocol and wake-request throttling

use crate::core::WorkItem;
use crate::queue::signal::{UnfairSemaphore, MAX_RELEASE};
use crossbeam_queue::SegQueue;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// Upper bound on how stale a blocked producer's view of the queue size may
/// get before it re-checks, even if no "space freed" notification arrived.
const BACKPRESSURE_RECHECK: Duration = Duration::from_millis(50);

/// The pool's shared work queue.
///
/// The underlying store is unbounded; `max_size` is a *soft* bound enforced by
/// blocking producers once the live count reaches it. Under concurrent
/// producers the queue can transiently exceed the bound by a small amount;
/// backpressure is a rate limiter, not a hard capacity cap.
///
/// # Wake-request throttling
///
/// Two counters coordinate consumer wake-up. The [`UnfairSemaphore`] holds the
/// actual wake credits; `outstanding_requests` tracks how many workers have
/// been promised a wake-up but have not consumed it yet, capped at the host's
/// logical processor count. The cap prevents a burst of producers from
/// flooding the signal with redundant releases (at most one outstanding
/// wake-up per idle worker slot), and keeps any single release far below the
/// signal's [`MAX_RELEASE`] bound.
pub struct WorkQueue {
    items: SegQueue<WorkItem>,
    wake: UnfairSemaphore,
    outstanding_requests: AtomicUsize,
    completed: AtomicBool,
    len: AtomicUsize,
    max_size: usize,
    wake_ceiling: usize,
    space_lock: Mutex<()>,
    space_freed: Condvar,
}

impl WorkQueue {
    /// Creates a queue with the given soft capacity bound.
    ///
    /// # Panics
    ///
    /// Panics if `max_size` is 0; settings validation resolves the default
    /// before the queue is built.
    pub fn new(max_size: usize) -> Self {
        assert!(max_size > 0, "max_size must be greater than 0");
        Self {
            items: SegQueue::new(),
            wake: UnfairSemaphore::new(),
            outstanding_requests: AtomicUsize::new(0),
            completed: AtomicBool::new(false),
            len: AtomicUsize::new(0),
            max_size,
            wake_ceiling: num_cpus::get(),
            space_lock: Mutex::new(()),
            space_freed: Condvar::new(),
        }
    }

    /// Enqueues a work item unless completion has been requested.
    ///
    /// Returns `true` iff the item is guaranteed to eventually execute;
    /// `false` means the item was not enqueued and never will run.
    ///
    /// The calling thread may block: once the live count reaches the soft
    /// maximum, the producer parks until a consumer frees space. The
    /// producer's own item has already been accepted at that point;
    /// backpressure throttles this thread's *next* submission, not the
    /// current one.
    pub fn try_add(&self, work: WorkItem) -> bool {
        if self.is_completed() {
            return false;
        }

        self.items.push(work);
        let size = self.len.fetch_add(1, Ordering::SeqCst) + 1;

        // Request the wake-up before parking: a consumer must be able to
        // drain while this producer waits below the capacity bound.
        self.ensure_thread_requested();

        if size >= self.max_size {
            self.wait_for_space();
        }

        true
    }

    /// Parks the producer until the live count drops below the soft maximum.
    fn wait_for_space(&self) {
        let mut guard = self.space_lock.lock();
        while self.len.load(Ordering::SeqCst) >= self.max_size {
            // Timed wait bounds staleness if a notification is missed.
            self.space_freed
                .wait_for(&mut guard, BACKPRESSURE_RECHECK);
        }
    }

    /// Pulls the next work item, blocking while the queue is empty and not
    /// completed.
    ///
    /// Returns `None` only once completion has been requested *and* the queue
    /// has drained; this is the sole exit path of a worker's pull loop. Items
    /// enqueued racing with completion are still delivered exactly once,
    /// because the dequeue is retried before the completion check.
    pub fn pop(&self) -> Option<WorkItem> {
        loop {
            if let Some(work) = self.items.pop() {
                self.len.fetch_sub(1, Ordering::SeqCst);
                drop(self.space_lock.lock());
                self.space_freed.notify_all();
                return Some(work);
            }

            if self.is_completed() {
                return None;
            }

            // Queue observed empty: consume one wake credit (spin, then
            // block) and account for the satisfied request before looking at
            // the queue again.
            self.wake.wait(None);
            self.mark_thread_request_satisfied();
        }
    }

    /// Requests completion: no further items are accepted, and every worker
    /// is guaranteed a wake-up so it can drain and exit.
    ///
    /// Idempotent; only the first call floods the signal.
    pub fn complete(&self) {
        if self.completed.swap(true, Ordering::SeqCst) {
            return;
        }

        // Force the outstanding-request counter to the signal's release
        // bound and release the gap in credits. Every worker currently
        // blocked, or about to block, receives a credit, observes the
        // completed flag, and exits once the queue empties. Without this,
        // blocked workers would leak on shutdown.
        loop {
            let count = self.outstanding_requests.load(Ordering::SeqCst);
            let to_release = MAX_RELEASE as usize - count;
            if self
                .outstanding_requests
                .compare_exchange(
                    count,
                    MAX_RELEASE as usize,
                    Ordering::SeqCst,
                    Ordering::SeqCst,
                )
                .is_ok()
            {
                self.wake.release(to_release as u16);
                break;
            }
        }
    }

    /// Whether completion has been requested.
    pub fn is_completed(&self) -> bool {
        self.completed.load(Ordering::SeqCst)
    }

    /// Current live item count (approximate under contention).
    pub fn len(&self) -> usize {
        self.len.load(Ordering::SeqCst)
    }

    /// Whether the queue currently holds no items.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The configured soft capacity bound.
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Issues a wake-signal release unless one outstanding wake-up already
    /// exists for every idle worker slot.
    ///
    /// The CAS retry loop caps the counter at the processor count, so
    /// concurrent producers cannot oversubscribe the signal.
    fn ensure_thread_requested(&self) {
        let mut count = self.outstanding_requests.load(Ordering::SeqCst);
        while count < self.wake_ceiling {
            match self.outstanding_requests.compare_exchange(
                count,
                count + 1,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => {
                    self.wake.release(1);
                    break;
                }
                Err(prev) => count = prev,
            }
        }
    }

    /// Matching decrement, called once a worker actually woke from the
    /// signal.
    fn mark_thread_request_satisfied(&self) {
        let mut count = self.outstanding_requests.load(Ordering::SeqCst);
        while count > 0 {
            match self.outstanding_requests.compare_exchange(
                count,
                count - 1,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => break,
                Err(prev) => count = prev,
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn outstanding_requests(&self) -> usize {
        self.outstanding_requests.load(Ordering::SeqCst)
    }
}
