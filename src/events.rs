//! Event kinds and the message-handler registry.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, PoisonError, RwLock};

/// Event kinds a handler can be registered for.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// An inbound message from the remote peer
    Message,
}

/// Caller-supplied callback invoked once per inbound message with the raw,
/// untransformed frame payload.
///
/// Handler identity is the `Arc` pointer: registering a clone of an already
/// registered handler is a no-op, and removal matches the same `Arc`.
pub type MessageHandler = Arc<dyn Fn(&str) + Send + Sync>;

/// Set of registered message handlers, in insertion order.
pub(crate) struct HandlerRegistry {
    message: RwLock<Vec<MessageHandler>>,
}

impl HandlerRegistry {
    pub(crate) fn new() -> Self {
        Self {
            message: RwLock::new(Vec::new()),
        }
    }

    /// Register `handler`. Adding the same handler twice has no additional
    /// effect.
    pub(crate) fn add(&self, handler: MessageHandler) {
        let mut handlers = self.message.write().unwrap_or_else(PoisonError::into_inner);
        if !handlers.iter().any(|h| Arc::ptr_eq(h, &handler)) {
            handlers.push(handler);
        }
    }

    /// Remove `handler` from the same set `add` populates. Unknown handlers
    /// are ignored.
    pub(crate) fn remove(&self, handler: &MessageHandler) {
        let mut handlers = self.message.write().unwrap_or_else(PoisonError::into_inner);
        handlers.retain(|h| !Arc::ptr_eq(h, handler));
    }

    /// Invoke every registered handler with `payload`, in insertion order.
    ///
    /// Dispatch runs over a snapshot of the set, so handlers added or removed
    /// mid-dispatch only affect later messages. A panicking handler is caught
    /// and logged as a warning; the remaining handlers still run and the
    /// connection is unaffected.
    pub(crate) fn dispatch(&self, payload: &str) {
        let snapshot: Vec<MessageHandler> = self
            .message
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        for handler in snapshot {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| handler(payload))) {
                #[cfg(feature = "tracing")]
                {
                    let reason = panic
                        .downcast_ref::<&str>()
                        .copied()
                        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
                        .unwrap_or("opaque panic payload");
                    tracing::warn!(reason, "error in message handler");
                }
                #[cfg(not(feature = "tracing"))]
                let _ = &panic;
            }
        }
    }
}
