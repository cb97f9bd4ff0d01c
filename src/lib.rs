//! # Dedicated Thread Pool
//!
//! An instanced thread pool with dedicated worker threads, a backpressured
//! work queue, and a cooperative task-scheduler adapter.
//!
//! ## Features
//!
//! - **Dedicated Workers**: A fixed set of worker threads created eagerly and
//!   owned by the pool instance, isolated from any global pool
//! - **Backpressured Queue**: Unbounded lock-free storage with a soft capacity
//!   that briefly parks producers instead of rejecting work
//! - **Panic Isolation**: A panicking work item never takes its worker down;
//!   payloads are forwarded to a configurable handler
//! - **Graceful Shutdown**: Non-blocking, idempotent shutdown that drains all
//!   accepted work, plus bounded and unbounded waits for worker exit
//! - **Scheduler Adapter**: Runs task-graph nodes on the pool with FIFO
//!   ordering, retraction, and inline execution on drain threads
//!
//! ## Quick Start
//!
//! ```rust
//! use dedicated_thread_pool::prelude::*;
//!
//! # fn main() -> Result<()> {
//! let pool = DedicatedThreadPool::new(PoolSettings::new(4))?;
//!
//! for i in 0..10 {
//!     pool.submit(move || {
//!         println!("work item {} executing", i);
//!     });
//! }
//!
//! // Shut down and wait for the queue to drain.
//! pool.wait_for_exit();
//! # Ok(())
//! # }
//! ```
//!
//! ## Pool Configuration
//!
//! ```rust
//! use dedicated_thread_pool::prelude::*;
//!
//! # fn main() -> Result<()> {
//! let settings = PoolSettings::new(2)
//!     .with_name("render")
//!     .with_thread_kind(ThreadKind::Foreground)
//!     .with_max_queue_size(64);
//!
//! let pool = DedicatedThreadPool::new(settings)?;
//! # pool.wait_for_exit();
//! # Ok(())
//! # }
//! ```
//!
//! ## Task Scheduling
//!
//! ```rust
//! use dedicated_thread_pool::prelude::*;
//! use std::sync::Arc;
//!
//! struct PrintTask {
//!     message: String,
//! }
//!
//! impl Task for PrintTask {
//!     fn run(&self, _ctx: &TaskContext) {
//!         println!("{}", self.message);
//!     }
//! }
//!
//! # fn main() -> Result<()> {
//! let pool = Arc::new(DedicatedThreadPool::new(PoolSettings::new(2))?);
//! let scheduler = PoolTaskScheduler::new(Arc::clone(&pool));
//!
//! scheduler.queue_task(Arc::new(PrintTask {
//!     message: "hello".to_string(),
//! }));
//! # std::thread::sleep(std::time::Duration::from_millis(100));
//! # pool.wait_for_exit();
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod core;
pub mod pool;
pub mod queue;
pub mod scheduler;

pub mod prelude;

pub use crate::core::{PoolError, Result, WorkItem};
pub use crate::pool::{DedicatedThreadPool, PoolSettings, ThreadKind};
pub use crate::scheduler::{PoolTaskScheduler, Task, TaskContext};
