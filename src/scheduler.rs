//! Cooperative task-scheduler adapter over the pool
//!
//! Presents a [`DedicatedThreadPool`] as a scheduler for a task-graph
//! runtime. The adapter keeps its own FIFO list of pending task nodes and,
//! per burst of work, requests at most `num_threads` concurrent *drain jobs*
//! on the pool. Each drain job repeatedly pops the first pending node and
//! executes it until the list is empty. Nodes therefore run on pool threads
//! without the adapter ever bypassing the pool's queue.

use crate::core::{panic_message, PoolError, Result};
use crate::pool::DedicatedThreadPool;
use log::error;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

/// A task-graph node the scheduler can execute.
///
/// Nodes are shared via `Arc` and identified by pointer equality, so the
/// same allocation can be queued, retracted, or inlined.
pub trait Task: Send + Sync {
    /// Executes the node.
    ///
    /// The context tells the node whether the current thread is participating
    /// in a drain job, which gates [`try_execute_inline`]
    /// (`PoolTaskScheduler::try_execute_inline`).
    fn run(&self, ctx: &TaskContext);
}

/// Execution context handed to [`Task::run`].
///
/// Carries the "this thread is inside a drain job" fact as an explicit value
/// instead of hidden per-thread state, so inline-execution eligibility is
/// visible at the call site and testable.
#[derive(Debug, Clone)]
pub struct TaskContext {
    draining: bool,
}

impl TaskContext {
    /// Context for a thread that is not participating in any drain job.
    /// Inline execution is refused under this context.
    pub fn detached() -> Self {
        Self { draining: false }
    }

    fn draining() -> Self {
        Self { draining: true }
    }

    /// Whether the current thread is inside one of this scheduler's drain
    /// jobs.
    pub fn is_draining(&self) -> bool {
        self.draining
    }
}

/// Scheduler adapter that batches task nodes onto a [`DedicatedThreadPool`].
pub struct PoolTaskScheduler {
    pool: Arc<DedicatedThreadPool>,
    /// Pending nodes in FIFO order. The mutex guards list mutation only,
    /// never node execution.
    pending: Mutex<VecDeque<Arc<dyn Task>>>,
    /// Number of drain jobs currently requested or running, bounded by the
    /// pool's thread count via the same CAS-retry throttle the work queue
    /// uses for wake requests.
    parallel_workers: AtomicUsize,
    /// Self-reference handed to drain jobs submitted to the pool.
    self_ref: Weak<PoolTaskScheduler>,
}

impl PoolTaskScheduler {
    /// Creates a scheduler over the given pool.
    pub fn new(pool: Arc<DedicatedThreadPool>) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            pool,
            pending: Mutex::new(VecDeque::new()),
            parallel_workers: AtomicUsize::new(0),
            self_ref: weak.clone(),
        })
    }

    /// Appends a node to the pending list and makes sure a drain job will
    /// pick it up.
    ///
    /// Nothing beyond this call is needed for the node to eventually execute,
    /// unless the pool has already been shut down.
    pub fn queue_task(&self, task: Arc<dyn Task>) {
        self.pending.lock().push_back(task);
        self.ensure_worker_requested();
    }

    /// Removes a specific node from the pending list if still present.
    ///
    /// Returns `false` when the node was already claimed by a drain job (or
    /// was never queued). Supports external retraction and inline execution.
    pub fn try_dequeue(&self, task: &Arc<dyn Task>) -> bool {
        let mut pending = self.pending.lock();
        if let Some(pos) = pending.iter().position(|t| Arc::ptr_eq(t, task)) {
            pending.remove(pos);
            true
        } else {
            false
        }
    }

    /// Attempts to execute `task` synchronously on the calling thread.
    ///
    /// Permitted only when `ctx` marks the thread as participating in a drain
    /// job. A previously queued node must first be atomically removed from
    /// the pending list; if another drain job already claimed it, inline
    /// execution is refused. Returns whether the node was executed.
    pub fn try_execute_inline(
        &self,
        ctx: &TaskContext,
        task: &Arc<dyn Task>,
        was_queued: bool,
    ) -> bool {
        if !ctx.is_draining() {
            return false;
        }
        if was_queued && !self.try_dequeue(task) {
            return false;
        }
        task.run(ctx);
        true
    }

    /// The scheduler's concurrency ceiling: the pool's thread count.
    pub fn maximum_concurrency(&self) -> usize {
        self.pool.num_threads()
    }

    /// Number of nodes currently pending (diagnostic, approximate).
    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Best-effort snapshot of the pending nodes, for diagnostics.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::SchedulerBusy`] if the list lock cannot be
    /// acquired immediately; the snapshot never blocks.
    pub fn scheduled_tasks(&self) -> Result<Vec<Arc<dyn Task>>> {
        match self.pending.try_lock() {
            Some(pending) => Ok(pending.iter().cloned().collect()),
            None => Err(PoolError::SchedulerBusy),
        }
    }

    /// Requests one more drain job unless `num_threads` are already active.
    fn ensure_worker_requested(&self) {
        let ceiling = self.pool.num_threads();
        let mut count = self.parallel_workers.load(Ordering::SeqCst);
        while count < ceiling {
            match self.parallel_workers.compare_exchange(
                count,
                count + 1,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => {
                    self.request_worker();
                    break;
                }
                Err(prev) => count = prev,
            }
        }
    }

    fn release_worker(&self) {
        let mut count = self.parallel_workers.load(Ordering::SeqCst);
        while count > 0 {
            match self.parallel_workers.compare_exchange(
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

    fn request_worker(&self) {
        // Upgrading fails only while the scheduler itself is being dropped,
        // and a scheduler with no owners has no caller left to drain for.
        let submitted = match self.self_ref.upgrade() {
            Some(scheduler) => self.pool.submit(move || scheduler.drain()),
            None => false,
        };
        if !submitted {
            // The drain job will never run, so the slot it was promised must
            // be handed back.
            self.release_worker();
        }
    }

    /// Drain-job body, running on a pool thread.
    ///
    /// Pops under the list mutex, executes outside it, so long-running nodes
    /// never hold the lock. A panicking node is contained here the same way
    /// the workers contain panicking work items: the loop keeps draining and
    /// the drain slot is always returned.
    fn drain(&self) {
        let ctx = TaskContext::draining();
        loop {
            let task = {
                let mut pending = self.pending.lock();
                match pending.pop_front() {
                    Some(task) => task,
                    None => {
                        self.release_worker();
                        break;
                    }
                }
            };
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| task.run(&ctx))) {
                error!(
                    "scheduler drain: task panicked: {}",
                    panic_message(payload.as_ref())
                );
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn parallel_workers(&self) -> usize {
        self.parallel_workers.load(Ordering::SeqCst)
    }
}
