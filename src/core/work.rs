//! Work-item and panic-handler types

use std::any::Any;
use std::sync::Arc;

/// A single unit of work submitted to the pool.
///
/// Work items are opaque: they carry no identity beyond their position in the
/// queue. The queue owns an item from enqueue until dequeue; the executing
/// worker owns it until it returns or panics, after which it is discarded.
pub type WorkItem = Box<dyn FnOnce() + Send + 'static>;

/// Payload captured from a panicking work item.
pub type PanicPayload = Box<dyn Any + Send + 'static>;

/// Handler invoked with the payload of every work item that panics.
///
/// The handler is shared by all workers and must be safe to call concurrently
/// from any worker thread. Panics are fully isolated per item: a panicking
/// item never terminates its worker or affects other queued items.
pub type PanicHandler = Arc<dyn Fn(PanicPayload) + Send + Sync>;

/// Returns a handler that silently discards panic payloads.
///
/// This is the default when no handler is configured.
pub fn discard_panics() -> PanicHandler {
    Arc::new(|_| {})
}

/// Extracts a human-readable message from a panic payload.
///
/// Panic payloads are usually `&str` or `String`; anything else is reported
/// as an unknown panic.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
