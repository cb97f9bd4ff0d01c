//! Instanced thread pool facade

use crate::core::WorkItem;
use crate::pool::settings::{PoolSettings, ThreadKind};
use crate::pool::worker::PoolWorker;
use crate::queue::WorkQueue;
use log::warn;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// An instanced pool of dedicated worker threads.
///
/// All `num_threads` workers are created eagerly during construction and live
/// for the pool's whole lifetime; the pool never resizes or replaces them.
/// Producers on arbitrary threads call [`submit`](Self::submit); the shared
/// [`WorkQueue`] applies backpressure and wakes idle workers.
///
/// # Shutdown
///
/// [`shutdown`](Self::shutdown) is a non-blocking, idempotent request: the
/// queue stops accepting work, and every worker drains what remains and then
/// exits. [`wait_for_exit`](Self::wait_for_exit) additionally blocks until
/// all workers have exited. Timing out never cancels outstanding work.
pub struct DedicatedThreadPool {
    settings: PoolSettings,
    queue: Arc<WorkQueue>,
    workers: Mutex<Vec<PoolWorker>>,
}

impl std::fmt::Debug for DedicatedThreadPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DedicatedThreadPool")
            .field("settings", &self.settings)
            .field("queue_len", &self.queue.len())
            .field("is_shut_down", &self.queue.is_completed())
            .finish()
    }
}

impl DedicatedThreadPool {
    /// Creates the pool and eagerly starts all worker threads.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidConfig`](crate::core::PoolError) if the
    /// settings fail validation, or
    /// [`PoolError::SpawnError`](crate::core::PoolError) if a worker thread
    /// cannot be created.
    pub fn new(settings: PoolSettings) -> crate::core::Result<Self> {
        settings.validate()?;

        let queue = Arc::new(WorkQueue::new(settings.effective_max_queue_size()));
        let workers = (1..=settings.num_threads)
            .map(|id| PoolWorker::new(id, Arc::clone(&queue), &settings))
            .collect::<crate::core::Result<Vec<_>>>()?;

        Ok(Self {
            settings,
            queue,
            workers: Mutex::new(workers),
        })
    }

    /// Submits one unit of work.
    ///
    /// Returns `true` iff the work is guaranteed to eventually execute;
    /// `false` means the pool has been shut down and the work will never run.
    /// The call may block briefly under backpressure once the queue reaches
    /// its soft bound.
    pub fn submit<F>(&self, work: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.queue.try_add(Box::new(work))
    }

    /// Submits an already-boxed work item. Same contract as
    /// [`submit`](Self::submit).
    pub fn submit_boxed(&self, work: WorkItem) -> bool {
        self.queue.try_add(work)
    }

    /// Requests shutdown: no further submissions are accepted, queued work
    /// still drains. Idempotent and non-blocking.
    pub fn shutdown(&self) {
        self.queue.complete();
    }

    /// Requests shutdown and blocks until every worker has exited.
    ///
    /// Calling this more than once is safe.
    pub fn wait_for_exit(&self) {
        self.queue.complete();
        for worker in self.workers.lock().iter() {
            worker.wait_for_exit(None);
        }
    }

    /// Requests shutdown and blocks until every worker has exited or
    /// `timeout` elapses.
    ///
    /// Returns `true` if all workers exited in time. On timeout, workers keep
    /// running until the queue is drained - only the caller's wait is
    /// bounded.
    pub fn wait_for_exit_timeout(&self, timeout: Duration) -> bool {
        self.queue.complete();
        let deadline = Instant::now() + timeout;
        self.workers
            .lock()
            .iter()
            .all(|worker| worker.wait_for_exit(Some(deadline)))
    }

    /// The configured number of worker threads.
    pub fn num_threads(&self) -> usize {
        self.settings.num_threads
    }

    /// The pool's settings.
    pub fn settings(&self) -> &PoolSettings {
        &self.settings
    }

    /// Current number of queued work items (approximate).
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Whether shutdown has been requested.
    pub fn is_shut_down(&self) -> bool {
        self.queue.is_completed()
    }
}

impl Drop for DedicatedThreadPool {
    fn drop(&mut self) {
        self.queue.complete();

        if self.settings.thread_kind == ThreadKind::Foreground {
            for worker in self.workers.lock().iter_mut() {
                if let Err(e) = worker.join() {
                    warn!("pool '{}': {}", self.settings.name, e);
                }
            }
        }
    }
}
