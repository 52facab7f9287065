//! # Idempotency Store
//!
//! Atomic lock/done tracking keyed by task identity, backed by a distributed
//! cache. The cache's atomic create-if-absent is the lock: no further
//! locking is layered on top, and correctness holds across processes and
//! machines exactly as far as the backend's atomicity does.
//!
//! Keys are derived, never raw: `"<prefix>:<task_type>:<digest>"` plus a
//! `:lock` or `:done` suffix, where the digest is a truncated SHA-256 of the
//! length-prefixed `(task_type, idempotency_key)` pair. This bounds key
//! length and keeps payload content out of cache keys.

use serde_json::json;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheResult, CacheStrategy};
use crate::constants::system::{IDEMPOTENCY_DIGEST_LENGTH, MIN_TTL_SECONDS};

/// Derived identity of one logical idempotent execution
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdempotencyId {
    task_type: String,
    digest: String,
}

impl IdempotencyId {
    /// Derive the identity for a task type and idempotency key
    pub fn derive(task_type: &str, idempotency_key: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update((task_type.len() as u64).to_be_bytes());
        hasher.update(task_type.as_bytes());
        hasher.update(idempotency_key.as_bytes());

        let mut digest = hex::encode(hasher.finalize());
        digest.truncate(IDEMPOTENCY_DIGEST_LENGTH);

        Self {
            task_type: task_type.to_string(),
            digest,
        }
    }

    pub fn task_type(&self) -> &str {
        &self.task_type
    }
}

impl std::fmt::Display for IdempotencyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.task_type, self.digest)
    }
}

/// Lock and done tracking for idempotent task deliveries
pub struct IdempotencyStore {
    cache: Arc<dyn CacheStrategy>,
    key_prefix: String,
}

impl IdempotencyStore {
    pub fn new(cache: Arc<dyn CacheStrategy>, key_prefix: impl Into<String>) -> Self {
        Self {
            cache,
            key_prefix: key_prefix.into(),
        }
    }

    /// Atomically create the lock entry iff absent, with the requested TTL
    /// (clamped to at least one second). Returns `true` iff this caller now
    /// owns the lock.
    pub async fn acquire(&self, id: &IdempotencyId, lock_ttl_seconds: u64) -> CacheResult<bool> {
        let ttl = Duration::from_secs(lock_ttl_seconds.max(MIN_TTL_SECONDS));
        self.cache.add_if_absent(&self.lock_key(id), json!(1), ttl).await
    }

    /// Whether an unexpired done entry exists for this identity
    pub async fn is_done(&self, id: &IdempotencyId) -> CacheResult<bool> {
        Ok(self.cache.get(&self.done_key(id)).await?.is_some())
    }

    /// Record a completed execution, suppressing re-execution for the given
    /// TTL (clamped to at least one second)
    pub async fn mark_done(&self, id: &IdempotencyId, done_ttl_seconds: u64) -> CacheResult<()> {
        let ttl = Duration::from_secs(done_ttl_seconds.max(MIN_TTL_SECONDS));
        self.cache.set(&self.done_key(id), json!(1), Some(ttl)).await
    }

    /// Delete the lock entry unconditionally. Deleting an absent entry is
    /// not an error.
    pub async fn release(&self, id: &IdempotencyId) -> CacheResult<()> {
        self.cache.delete(&self.lock_key(id)).await
    }

    fn base_key(&self, id: &IdempotencyId) -> String {
        format!("{}:{}:{}", self.key_prefix, id.task_type, id.digest)
    }

    fn lock_key(&self, id: &IdempotencyId) -> String {
        format!("{}:lock", self.base_key(id))
    }

    fn done_key(&self, id: &IdempotencyId) -> String {
        format!("{}:done", self.base_key(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCacheStrategy;

    fn store() -> IdempotencyStore {
        IdempotencyStore::new(Arc::new(InMemoryCacheStrategy::new()), "relay")
    }

    #[test]
    fn test_identity_digest_is_truncated_and_stable() {
        let a = IdempotencyId::derive("send_welcome_email", "user:42");
        let b = IdempotencyId::derive("send_welcome_email", "user:42");
        assert_eq!(a, b);
        assert_eq!(a.to_string().len(), "send_welcome_email:".len() + 40);
    }

    #[test]
    fn test_identity_separates_task_types() {
        let a = IdempotencyId::derive("task_a", "key");
        let b = IdempotencyId::derive("task_b", "key");
        assert_ne!(a, b);
    }

    #[test]
    fn test_identity_length_prefix_prevents_boundary_collisions() {
        let a = IdempotencyId::derive("ab", "c");
        let b = IdempotencyId::derive("a", "bc");
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_acquire_is_exclusive_until_release() {
        let store = store();
        let id = IdempotencyId::derive("send_welcome_email", "user:42");

        assert!(store.acquire(&id, 600).await.unwrap());
        assert!(!store.acquire(&id, 600).await.unwrap());

        store.release(&id).await.unwrap();
        assert!(store.acquire(&id, 600).await.unwrap());
    }

    #[tokio::test]
    async fn test_release_of_absent_lock_is_not_an_error() {
        let store = store();
        let id = IdempotencyId::derive("send_welcome_email", "user:42");
        store.release(&id).await.unwrap();
    }

    #[tokio::test]
    async fn test_done_tracking() {
        let store = store();
        let id = IdempotencyId::derive("send_welcome_email", "user:42");

        assert!(!store.is_done(&id).await.unwrap());
        store.mark_done(&id, 3600).await.unwrap();
        assert!(store.is_done(&id).await.unwrap());
    }

    #[tokio::test]
    async fn test_done_entry_expires() {
        let store = store();
        let id = IdempotencyId::derive("send_welcome_email", "user:42");

        store.mark_done(&id, 1).await.unwrap();
        assert!(store.is_done(&id).await.unwrap());

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(!store.is_done(&id).await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_lock_is_reacquirable() {
        let store = store();
        let id = IdempotencyId::derive("send_welcome_email", "user:42");

        // Zero-second requests are clamped to the one-second minimum.
        assert!(store.acquire(&id, 0).await.unwrap());
        assert!(!store.acquire(&id, 0).await.unwrap());

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(store.acquire(&id, 600).await.unwrap());
    }

    #[tokio::test]
    async fn test_lock_and_done_entries_are_independent() {
        let store = store();
        let id = IdempotencyId::derive("send_welcome_email", "user:42");

        assert!(store.acquire(&id, 600).await.unwrap());
        store.mark_done(&id, 3600).await.unwrap();
        store.release(&id).await.unwrap();

        // Releasing the lock must not clear the done marker.
        assert!(store.is_done(&id).await.unwrap());
    }
}
