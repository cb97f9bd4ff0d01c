//! Unfair counting wake signal for producer/consumer handoff

use crossbeam_utils::Backoff;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicIsize, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Maximum number of credits a single [`UnfairSemaphore::release`] call may add.
///
/// The bound keeps a release representable in a 16-bit signed range, matching
/// the limits of the blocking primitives this signal is meant to sit on top
/// of. Callers must never request a larger release in one call; the
/// [`WorkQueue`](crate::queue::WorkQueue) outstanding-request counter exists
/// to keep releases far below this bound during normal operation.
pub const MAX_RELEASE: u16 = i16::MAX as u16;

/// Base number of acquire attempts before a waiter falls back to blocking.
const SPIN_BASE: u32 = 32;

/// Upper bound on the random extra spins added per wait call.
const SPIN_JITTER: u32 = 32;

/// A counting signal optimized for high-throughput thread wake-up.
///
/// `release(n)` adds `n` wake credits; `wait` consumes one, spinning briefly
/// before falling back to a true blocking wait. The signal is *unfair*: a
/// thread that is actively spinning may grab a credit ahead of a thread that
/// has been blocked longer. That trade loses FIFO wake order but avoids a
/// context switch whenever work arrives while a consumer is still spinning.
pub struct UnfairSemaphore {
    /// Available wake credits. Only `release` adds; waiters CAS it down and
    /// never below zero.
    credits: AtomicIsize,
    /// Number of waiters that have entered (or are entering) the blocking
    /// path. Used to skip the lock on release when nobody is asleep.
    sleepers: AtomicUsize,
    lock: Mutex<()>,
    available: Condvar,
}

impl UnfairSemaphore {
    /// Creates a signal with no available credits.
    pub fn new() -> Self {
        Self {
            credits: AtomicIsize::new(0),
            sleepers: AtomicUsize::new(0),
            lock: Mutex::new(()),
            available: Condvar::new(),
        }
    }

    /// Adds `n` wake credits, waking up to `n` blocked waiters.
    ///
    /// Credits not consumed by a currently blocked waiter satisfy future
    /// `wait` calls.
    ///
    /// # Panics
    ///
    /// Panics if `n` exceeds [`MAX_RELEASE`].
    pub fn release(&self, n: u16) {
        assert!(n <= MAX_RELEASE, "release count {} exceeds MAX_RELEASE", n);
        if n == 0 {
            return;
        }
        self.credits.fetch_add(n as isize, Ordering::SeqCst);
        if self.sleepers.load(Ordering::SeqCst) > 0 {
            // Taking the lock serializes with waiters between their failed
            // acquire and their condvar wait, closing the lost-wakeup window.
            drop(self.lock.lock());
            if n == 1 {
                self.available.notify_one();
            } else {
                self.available.notify_all();
            }
        }
    }

    /// Blocks until a credit is available or `timeout` elapses.
    ///
    /// Returns `true` if a credit was obtained. `None` waits without bound.
    pub fn wait(&self, timeout: Option<Duration>) -> bool {
        // Spin phase: bounded retries with backoff, jittered so that herds of
        // waiters do not fall into lockstep.
        let backoff = Backoff::new();
        let spins = SPIN_BASE + fastrand::u32(..SPIN_JITTER);
        for _ in 0..spins {
            if self.try_acquire() {
                return true;
            }
            backoff.snooze();
        }

        let deadline = timeout.map(|t| Instant::now() + t);
        let mut guard = self.lock.lock();
        self.sleepers.fetch_add(1, Ordering::SeqCst);
        let acquired = loop {
            if self.try_acquire() {
                break true;
            }
            match deadline {
                None => self.available.wait(&mut guard),
                Some(deadline) => {
                    if self.available.wait_until(&mut guard, deadline).timed_out() {
                        break self.try_acquire();
                    }
                }
            }
        };
        self.sleepers.fetch_sub(1, Ordering::SeqCst);
        acquired
    }

    /// Consumes one credit if any is available, without blocking.
    pub fn try_acquire(&self) -> bool {
        let mut count = self.credits.load(Ordering::SeqCst);
        while count > 0 {
            match self.credits.compare_exchange(
                count,
                count - 1,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return true,
                Err(prev) => count = prev,
            }
        }
        false
    }

    /// Current number of unconsumed credits (approximate under contention).
    pub fn credits(&self) -> usize {
        self.credits.load(Ordering::SeqCst).max(0) as usize
    }
}

impl Default for UnfairSemaphore {
    fn default() -> Self {
        Self::new()
    }
}
