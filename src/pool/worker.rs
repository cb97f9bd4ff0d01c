//! Worker thread implementation

use crate::core::{panic_message, PoolError, Result};
use crate::pool::settings::PoolSettings;
use crate::queue::WorkQueue;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use log::{debug, error};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

/// Fires the worker's exit signal exactly once, even when the pull loop
/// unwinds abnormally.
struct ExitGuard {
    signal: Sender<()>,
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        let _ = self.signal.try_send(());
    }
}

/// A worker owning one dedicated thread for its entire lifetime.
///
/// The thread pulls from the shared [`WorkQueue`] in a loop; each item runs
/// under panic protection so a failing item can never take the thread down.
/// When the pull loop ends (queue completed and drained) the worker fires a
/// one-shot exit signal that the owning pool observes via
/// [`wait_for_exit`](PoolWorker::wait_for_exit).
pub struct PoolWorker {
    id: usize,
    exit: Receiver<()>,
    thread: Option<thread::JoinHandle<()>>,
}

impl PoolWorker {
    /// Creates the worker and immediately starts its thread, configured per
    /// the pool settings (name suffix, stack size, setup hook).
    pub fn new(id: usize, queue: Arc<WorkQueue>, settings: &PoolSettings) -> Result<Self> {
        let (exit_tx, exit_rx) = bounded(1);

        let mut builder = thread::Builder::new().name(format!("{}_{}", settings.name, id));
        if settings.stack_size > 0 {
            builder = builder.stack_size(settings.stack_size);
        }

        let panic_handler = Arc::clone(&settings.panic_handler);
        let thread_init = settings.thread_init.clone();
        let thread = builder
            .spawn(move || {
                let _exit_guard = ExitGuard { signal: exit_tx };

                if let Some(init) = thread_init {
                    init();
                }

                debug!("worker {} started", id);
                while let Some(work) = queue.pop() {
                    if let Err(payload) = catch_unwind(AssertUnwindSafe(work)) {
                        error!(
                            "worker {}: work item panicked: {}",
                            id,
                            panic_message(payload.as_ref())
                        );
                        panic_handler(payload);
                    }
                }
                debug!("worker {} shutting down", id);
            })
            .map_err(|e| PoolError::spawn_with_source(id, "Cannot create thread", e))?;

        Ok(Self {
            id,
            exit: exit_rx,
            thread: Some(thread),
        })
    }

    /// Get worker ID
    pub fn id(&self) -> usize {
        self.id
    }

    /// Blocks until this worker's pull loop has exited, or `deadline` passes.
    ///
    /// Returns `true` if the worker has exited. Safe to call repeatedly; a
    /// worker that already exited keeps reporting `true`.
    pub fn wait_for_exit(&self, deadline: Option<Instant>) -> bool {
        match deadline {
            None => {
                // A disconnect without a message also means the thread is
                // gone: the exit guard lives on the worker's stack.
                let _ = self.exit.recv();
                true
            }
            Some(deadline) => match self.exit.recv_deadline(deadline) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => true,
                Err(RecvTimeoutError::Timeout) => false,
            },
        }
    }

    /// Joins the underlying OS thread. Used for foreground pools, after the
    /// queue has been completed.
    pub fn join(&mut self) -> Result<()> {
        if let Some(thread) = self.thread.take() {
            thread
                .join()
                .map_err(|_| PoolError::other(format!("worker {} panicked", self.id)))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn test_settings() -> PoolSettings {
        PoolSettings::new(1).with_name("worker-test")
    }

    #[test]
    fn test_worker_executes_items() {
        let queue = Arc::new(WorkQueue::new(100));
        let mut worker =
            PoolWorker::new(1, Arc::clone(&queue), &test_settings()).expect("Failed to spawn");
        assert_eq!(worker.id(), 1);

        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..10 {
            let counter = Arc::clone(&counter);
            assert!(queue.try_add(Box::new(move || {
                counter.fetch_add(1, Ordering::Relaxed);
            })));
        }

        queue.complete();
        assert!(worker.wait_for_exit(Some(Instant::now() + Duration::from_secs(5))));
        assert_eq!(counter.load(Ordering::Relaxed), 10);
        worker.join().expect("Failed to join worker");
    }

    #[test]
    fn test_panic_does_not_kill_worker() {
        let caught = Arc::new(AtomicUsize::new(0));
        let caught_clone = Arc::clone(&caught);
        let settings = test_settings().with_panic_handler(move |_| {
            caught_clone.fetch_add(1, Ordering::SeqCst);
        });

        let queue = Arc::new(WorkQueue::new(100));
        let mut worker = PoolWorker::new(1, Arc::clone(&queue), &settings).expect("Failed to spawn");

        let executed = Arc::new(AtomicUsize::new(0));
        assert!(queue.try_add(Box::new(|| panic!("intentional panic for testing"))));
        let executed_clone = Arc::clone(&executed);
        assert!(queue.try_add(Box::new(move || {
            executed_clone.fetch_add(1, Ordering::SeqCst);
        })));

        queue.complete();
        assert!(worker.wait_for_exit(Some(Instant::now() + Duration::from_secs(5))));
        assert_eq!(caught.load(Ordering::SeqCst), 1);
        assert_eq!(executed.load(Ordering::SeqCst), 1);
        worker.join().expect("Failed to join worker");
    }

    #[test]
    fn test_wait_for_exit_times_out_while_running() {
        let queue = Arc::new(WorkQueue::new(100));
        let mut worker =
            PoolWorker::new(1, Arc::clone(&queue), &test_settings()).expect("Failed to spawn");

        // Queue not completed: the worker is blocked on the wake signal.
        assert!(!worker.wait_for_exit(Some(Instant::now() + Duration::from_millis(50))));

        queue.complete();
        assert!(worker.wait_for_exit(Some(Instant::now() + Duration::from_secs(5))));
        // Idempotent after exit.
        assert!(worker.wait_for_exit(Some(Instant::now() + Duration::from_millis(10))));
        worker.join().expect("Failed to join worker");
    }

    #[test]
    fn test_thread_init_runs_first() {
        let init_ran = Arc::new(AtomicUsize::new(0));
        let init_clone = Arc::clone(&init_ran);
        let settings = test_settings().with_thread_init(move || {
            init_clone.fetch_add(1, Ordering::SeqCst);
        });

        let queue = Arc::new(WorkQueue::new(100));
        let mut worker = PoolWorker::new(1, Arc::clone(&queue), &settings).expect("Failed to spawn");

        queue.complete();
        assert!(worker.wait_for_exit(Some(Instant::now() + Duration::from_secs(5))));
        assert_eq!(init_ran.load(Ordering::SeqCst), 1);
        worker.join().expect("Failed to join worker");
    }
}
