//! # Task Contract
//!
//! The [`Task`] trait ties a payload type to a stable task-type identifier,
//! and the optional idempotency capability marks tasks whose deliveries must
//! be deduplicated. Handlers implement [`TaskHandler`] for the task types
//! they process.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// A dispatchable unit of asynchronous work.
///
/// The payload is the type itself: serialization to a JSON object is the
/// wire payload, deserialization is the delivery-side factory. The trait
/// bounds make both directions available to the dispatcher without any
/// per-type glue.
///
/// # Example
///
/// ```rust
/// use relay_core::tasks::{IdempotencySpec, Task};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Serialize, Deserialize)]
/// struct SendWelcomeEmail {
///     user_id: u64,
/// }
///
/// impl Task for SendWelcomeEmail {
///     const TASK_TYPE: &'static str = "send_welcome_email";
///
///     fn idempotency(&self) -> Option<IdempotencySpec> {
///         Some(IdempotencySpec::new(
///             format!("user:{}", self.user_id),
///             3600,
///         ))
///     }
/// }
/// ```
pub trait Task: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Stable identifier of this task type. Constant per type, never per
    /// instance; it names the delivery hook and keys both the signature and
    /// the idempotency identity. Two task types must never share one.
    const TASK_TYPE: &'static str;

    /// Idempotency capability query. Tasks returning `Some` are deduplicated
    /// through the idempotency store; tasks returning `None` execute on every
    /// authentic delivery, duplicates included.
    fn idempotency(&self) -> Option<IdempotencySpec> {
        None
    }
}

/// Deduplication parameters for one logical execution of an idempotent task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdempotencySpec {
    /// Identity of the logical operation (e.g. `"user:42"`). Deliveries
    /// sharing a task type and key are the same operation.
    pub key: String,

    /// How long a completed execution suppresses re-execution, in seconds
    pub done_ttl_seconds: u64,

    /// Optional per-task lock TTL. When `None`, the configured default
    /// applies. Shorter than the real handler runtime risks double
    /// execution; much longer delays recovery from a crashed worker.
    pub lock_ttl_seconds: Option<u64>,
}

impl IdempotencySpec {
    /// Create a spec with the default lock TTL
    pub fn new(key: impl Into<String>, done_ttl_seconds: u64) -> Self {
        Self {
            key: key.into(),
            done_ttl_seconds,
            lock_ttl_seconds: None,
        }
    }

    /// Override the lock TTL for this task
    pub fn with_lock_ttl(mut self, lock_ttl_seconds: u64) -> Self {
        self.lock_ttl_seconds = Some(lock_ttl_seconds);
        self
    }
}

/// Processes deliveries of one task type.
///
/// Any number of handlers may be attached per task type; they run in
/// registration order, and the first failure stops the sequence.
#[async_trait]
pub trait TaskHandler<T: Task>: Send + Sync {
    /// Handle one delivery of `task`
    async fn handle(&self, task: &T) -> anyhow::Result<()>;
}
