//! Convenient re-exports for common types and traits

pub use crate::core::{PanicHandler, PoolError, Result, WorkItem};
pub use crate::pool::{DedicatedThreadPool, PoolSettings, ThreadInit, ThreadKind};
pub use crate::scheduler::{PoolTaskScheduler, Task, TaskContext};
