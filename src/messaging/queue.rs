//! # Queue Backend Port
//!
//! Traits the task dispatcher needs from a queue backend: fire-and-forget
//! enqueue under a named hook, and idempotent subscription of a single
//! delivery callback per hook.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use super::MessagingResult;

/// Callback invoked by the queue backend for each delivery.
///
/// Returning `Err` signals the backend that the delivery failed; whether and
/// when to redeliver is the backend's policy, not the subscriber's.
#[async_trait]
pub trait QueueSubscriber: Send + Sync {
    /// Handle one delivery of the opaque args enqueued under `hook_name`
    async fn on_message(
        &self,
        hook_name: &str,
        args: Value,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Named-hook queue backend with at-least-once asynchronous delivery
#[async_trait]
pub trait QueueBackend: Send + Sync {
    /// Whether the backend can currently accept enqueues. Dispatch fails
    /// synchronously when this is false.
    fn is_available(&self) -> bool {
        true
    }

    /// Enqueue `args` under `hook_name` for asynchronous delivery. Returns
    /// once the entry is queued; execution happens later, possibly more than
    /// once, with no ordering guarantee relative to other enqueues.
    async fn enqueue_async(&self, hook_name: &str, args: Value) -> MessagingResult<()>;

    /// Register `subscriber` as the delivery callback for `hook_name`.
    /// Subscribing the same hook again is a no-op.
    async fn subscribe(
        &self,
        hook_name: &str,
        subscriber: Arc<dyn QueueSubscriber>,
    ) -> MessagingResult<()>;
}
