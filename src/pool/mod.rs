//! Thread pool facade, workers, and settings

mod dedicated_pool;
mod settings;
mod worker;

pub use dedicated_pool::DedicatedThreadPool;
pub use settings::{PoolSettings, ThreadInit, ThreadKind};
pub use worker::PoolWorker;
