//! # Messaging
//!
//! Queue backend port for asynchronous task delivery. The backend is a named
//! hook system: producers enqueue opaque JSON args under a hook name, and the
//! backend redelivers them at-least-once, in no particular order, with
//! arbitrary delay, to the subscriber registered for that hook.
//!
//! The backend is an untrusted transport with respect to type integrity -
//! anything with queue access can enqueue args under a known hook name. The
//! task dispatcher layers an HMAC signature on top
//! (see [`crate::tasks::TaskSigner`]) rather than trusting the backend's own
//! access control.

pub mod errors;
pub mod in_memory;
pub mod queue;

pub use errors::{MessagingError, MessagingResult};
pub use in_memory::InMemoryQueueBackend;
pub use queue::{QueueBackend, QueueSubscriber};
