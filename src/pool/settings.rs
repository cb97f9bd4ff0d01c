//! Pool configuration

use crate::core::{discard_panics, PanicHandler, PoolError, Result};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// The kind of threads a pool runs - either foreground or background.
///
/// Background workers are detached when the pool is dropped; foreground
/// workers are joined, so dropping the pool blocks until they have drained
/// the queue and exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThreadKind {
    /// Workers are detached on pool drop (the default).
    #[default]
    Background,
    /// Workers are joined on pool drop.
    Foreground,
}

/// Per-thread setup hook, run first on each worker thread.
///
/// Covers platform-specific thread configuration (affinity, priority,
/// threading-model attributes) that the pool itself stays agnostic of.
pub type ThreadInit = Arc<dyn Fn() + Send + Sync>;

/// Settings for a [`DedicatedThreadPool`](crate::pool::DedicatedThreadPool).
///
/// Validated at pool construction and immutable afterward.
#[derive(Clone)]
pub struct PoolSettings {
    /// The total number of worker threads. Must be at least 1.
    pub num_threads: usize,
    /// Foreground or background workers. Default: background.
    pub thread_kind: ThreadKind,
    /// Pool name, used as the worker thread name prefix
    /// (`<name>_<workerId>`). Default: a generated unique name.
    pub name: String,
    /// Reserved: interval after which a stuck worker would be considered
    /// deadlocked. Must exceed zero when set. Currently unused - worker
    /// replacement was deliberately dropped because forcibly terminating a
    /// stuck thread is unsafe.
    pub deadlock_timeout: Option<Duration>,
    /// Optional per-thread setup hook.
    pub thread_init: Option<ThreadInit>,
    /// Handler for panics escaping work items. Default: silently discard.
    pub panic_handler: PanicHandler,
    /// Worker stack size in bytes; 0 uses the host default.
    pub stack_size: usize,
    /// Soft bound on queued items; 0 resolves to `num_threads * 100`.
    pub max_queue_size: usize,
}

impl std::fmt::Debug for PoolSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolSettings")
            .field("num_threads", &self.num_threads)
            .field("thread_kind", &self.thread_kind)
            .field("name", &self.name)
            .field("deadlock_timeout", &self.deadlock_timeout)
            .field("thread_init", &self.thread_init.as_ref().map(|_| "<hook>"))
            .field("panic_handler", &"<handler>")
            .field("stack_size", &self.stack_size)
            .field("max_queue_size", &self.max_queue_size)
            .finish()
    }
}

impl PoolSettings {
    /// Creates settings for a pool with the given thread count and defaults
    /// for everything else.
    #[must_use]
    pub fn new(num_threads: usize) -> Self {
        Self {
            num_threads,
            thread_kind: ThreadKind::default(),
            name: format!("dedicated-pool-{}", Uuid::new_v4()),
            deadlock_timeout: None,
            thread_init: None,
            panic_handler: discard_panics(),
            stack_size: 0,
            max_queue_size: 0,
        }
    }

    /// Set the thread kind.
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_thread_kind(mut self, kind: ThreadKind) -> Self {
        self.thread_kind = kind;
        self
    }

    /// Set the pool name.
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Set the reserved deadlock timeout.
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_deadlock_timeout(mut self, timeout: Duration) -> Self {
        self.deadlock_timeout = Some(timeout);
        self
    }

    /// Set the per-thread setup hook.
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_thread_init<F>(mut self, init: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.thread_init = Some(Arc::new(init));
        self
    }

    /// Set the panic handler invoked for every work item that panics.
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_panic_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(crate::core::PanicPayload) + Send + Sync + 'static,
    {
        self.panic_handler = Arc::new(handler);
        self
    }

    /// Set the worker stack size in bytes (0 = host default).
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = bytes;
        self
    }

    /// Set the soft queue bound (0 = `num_threads * 100`).
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_queue_size(mut self, size: usize) -> Self {
        self.max_queue_size = size;
        self
    }

    /// The soft queue bound the pool will actually use.
    pub fn effective_max_queue_size(&self) -> usize {
        if self.max_queue_size == 0 {
            self.num_threads * 100
        } else {
            self.max_queue_size
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.num_threads == 0 {
            return Err(PoolError::invalid_config(
                "num_threads",
                "numThreads must be at least 1. Was 0",
            ));
        }
        if let Some(timeout) = self.deadlock_timeout {
            if timeout.is_zero() {
                return Err(PoolError::invalid_config(
                    "deadlock_timeout",
                    "deadlockTimeout must be unset or at least 1ms",
                ));
            }
        }
        Ok(())
    }
}
