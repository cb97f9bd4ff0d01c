//! Core types for the thread pool

pub mod error;
pub mod work;

pub use error::{PoolError, Result};
pub use work::{discard_panics, panic_message, PanicHandler, PanicPayload, WorkItem};
