#![allow(clippy::doc_markdown)] // Allow technical terms like HMAC, JSON in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Relay Core
//!
//! Asynchronous task dispatch core with idempotency guarantees.
//!
//! ## Overview
//!
//! Relay Core binds an application framework's task contract to a host
//! platform's queue facilities. Producers hand a typed [`tasks::Task`] to the
//! [`tasks::TaskDispatcher`], which serializes it, signs it, and enqueues it on
//! a [`messaging::QueueBackend`] for asynchronous, at-least-once delivery.
//! On delivery the dispatcher verifies the signature, deduplicates idempotent
//! tasks through the [`tasks::IdempotencyStore`], and runs every registered
//! handler in registration order with a guaranteed lock release.
//!
//! ## Key Features
//!
//! - **Tamper-evident dispatch**: HMAC-SHA256 signatures bind a task's type to
//!   its payload, so forged or corrupted queue entries never reach a handler
//! - **At-most-once execution for idempotent tasks**: atomic lock/done
//!   tracking on a distributed cache, with TTL-bounded recovery from crashed
//!   workers
//! - **Ordered multi-handler fan-out**: any number of independent handlers per
//!   task type, invoked in registration order
//! - **Ports, not platforms**: queue, cache, and secret access are traits with
//!   in-memory reference implementations for development and testing
//!
//! ## Module Organization
//!
//! - [`tasks`] - Task contract, signer, idempotency store, handler registry,
//!   and the dispatcher itself
//! - [`messaging`] - Queue backend port and in-memory implementation
//! - [`cache`] - Cache strategy port and in-memory implementation
//! - [`auth`] - Secret provider port
//! - [`config`] - Configuration management
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging initialization
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use relay_core::auth::StaticSecretProvider;
//! use relay_core::cache::InMemoryCacheStrategy;
//! use relay_core::config::RelayConfig;
//! use relay_core::messaging::InMemoryQueueBackend;
//! use relay_core::tasks::{Task, TaskDispatcher, TaskHandler};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Serialize, Deserialize)]
//! struct SendWelcomeEmail {
//!     user_id: u64,
//! }
//!
//! impl Task for SendWelcomeEmail {
//!     const TASK_TYPE: &'static str = "send_welcome_email";
//! }
//!
//! struct EmailHandler;
//!
//! #[async_trait::async_trait]
//! impl TaskHandler<SendWelcomeEmail> for EmailHandler {
//!     async fn handle(&self, task: &SendWelcomeEmail) -> anyhow::Result<()> {
//!         println!("sending welcome email to user {}", task.user_id);
//!         Ok(())
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let dispatcher = TaskDispatcher::new(
//!     RelayConfig::default(),
//!     Arc::new(InMemoryQueueBackend::new()),
//!     Arc::new(InMemoryCacheStrategy::new()),
//!     Arc::new(StaticSecretProvider::new("s3cr3t")),
//! );
//!
//! dispatcher.attach::<SendWelcomeEmail, _>(EmailHandler).await?;
//! dispatcher.dispatch(&SendWelcomeEmail { user_id: 42 }).await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod cache;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod messaging;
pub mod tasks;

pub use auth::{EnvSecretProvider, SecretProvider, StaticSecretProvider};
pub use cache::{CacheStrategy, InMemoryCacheStrategy};
pub use config::{ConfigManager, RelayConfig};
pub use error::{RelayError, Result};
pub use messaging::{InMemoryQueueBackend, QueueBackend, QueueSubscriber};
pub use tasks::{
    DeliveryOutcome, IdempotencySpec, IdempotencyStore, Task, TaskDispatcher, TaskEnvelope,
    TaskHandler, TaskHandlerRegistry, TaskSigner,
};
