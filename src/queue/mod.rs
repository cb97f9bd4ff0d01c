//! Work queue and wake-signal primitives
//!
//! The queue couples three pieces: an unbounded lock-free store, a soft
//! capacity bound that throttles producers, and an [`UnfairSemaphore`] that
//! wakes idle workers with as few context switches as possible. See
//! [`WorkQueue`] for the coordination details.

mod signal;
mod work_queue;

pub use signal::{UnfairSemaphore, MAX_RELEASE};
pub use work_queue::WorkQueue;
