//! # Task Dispatch Subsystem
//!
//! Asynchronous task dispatch with idempotency guarantees. This is the core
//! of the crate: everything else exists to serve it.
//!
//! ## Components
//!
//! - [`task`] - the [`Task`] contract, the optional idempotency capability,
//!   and the [`TaskHandler`] trait
//! - [`envelope`] - the wire format carried through the queue backend
//! - [`signer`] - HMAC signatures binding a task's type to its payload
//! - [`idempotency`] - atomic lock/done tracking on a distributed cache
//! - [`registry`] - ordered multi-handler registration per task type
//! - [`dispatcher`] - the orchestrator tying it all together
//!
//! ## Delivery state machine
//!
//! ```text
//! Received -> Verified -> {Deduplicated | LockAcquired} -> Executing
//!          -> {Done | Failed} -> Released
//! ```
//!
//! Expected outcomes (duplicate, already running, already done) are values,
//! not errors; only handler and store failures propagate, and only after the
//! lock is released.

pub mod dispatcher;
pub mod envelope;
pub mod idempotency;
pub mod registry;
pub mod signer;
pub mod task;

pub use dispatcher::{DeliveryOutcome, TaskDispatcher};
pub use envelope::{hook_name, TaskEnvelope};
pub use idempotency::{IdempotencyId, IdempotencyStore};
pub use registry::TaskHandlerRegistry;
pub use signer::TaskSigner;
pub use task::{IdempotencySpec, Task, TaskHandler};
