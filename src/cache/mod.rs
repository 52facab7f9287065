//! # Cache Strategy Port
//!
//! Abstraction over the distributed key-value store backing the idempotency
//! subsystem. Correctness of idempotent task execution depends entirely on
//! [`CacheStrategy::add_if_absent`] being atomic across concurrent callers -
//! across processes and machines, not just threads. No additional locking is
//! layered on top: the store is the lock.

pub mod memory;

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

pub use memory::InMemoryCacheStrategy;

/// Errors from cache backend operations
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache backend unavailable: {message}")]
    Unavailable { message: String },

    #[error("Cache operation '{operation}' failed for key '{key}': {message}")]
    Operation {
        operation: String,
        key: String,
        message: String,
    },
}

impl CacheError {
    /// Create a backend-unavailable error
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Create an operation error
    pub fn operation(
        operation: impl Into<String>,
        key: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Operation {
            operation: operation.into(),
            key: key.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Distributed key-value store with TTL semantics and an atomic
/// create-if-absent primitive
#[async_trait]
pub trait CacheStrategy: Send + Sync {
    /// Atomically create `key` with `value` if and only if it does not
    /// already exist (or has expired). Returns `true` iff this call created
    /// the entry.
    async fn add_if_absent(&self, key: &str, value: Value, ttl: Duration) -> CacheResult<bool>;

    /// Fetch the unexpired value for `key`, if any
    async fn get(&self, key: &str) -> CacheResult<Option<Value>>;

    /// Create or overwrite `key`. A `None` TTL applies the backend's default.
    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> CacheResult<()>;

    /// Delete `key`. Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> CacheResult<()>;
}
