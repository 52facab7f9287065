//! # In-Memory Cache Strategy
//!
//! Process-local [`CacheStrategy`] for development and testing. Entries
//! expire lazily: an expired entry is treated as absent on read and may be
//! replaced by `add_if_absent`. Atomicity of `add_if_absent` comes from the
//! dashmap entry API, which holds the shard lock for the whole
//! check-and-insert.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;
use std::time::Duration;

use super::{CacheResult, CacheStrategy};
use crate::constants::system::DEFAULT_CACHE_TTL_SECONDS;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    expires_at: DateTime<Utc>,
}

impl CacheEntry {
    fn new(value: Value, ttl: Duration) -> Self {
        let ttl = ChronoDuration::from_std(ttl).unwrap_or_else(|_| ChronoDuration::seconds(
            DEFAULT_CACHE_TTL_SECONDS as i64,
        ));
        Self {
            value,
            expires_at: Utc::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// In-memory cache with TTL semantics and atomic create-if-absent
pub struct InMemoryCacheStrategy {
    entries: DashMap<String, CacheEntry>,
    default_ttl: Duration,
}

impl InMemoryCacheStrategy {
    /// Create a cache with the system default TTL for `set` calls without one
    pub fn new() -> Self {
        Self::with_default_ttl(Duration::from_secs(DEFAULT_CACHE_TTL_SECONDS))
    }

    /// Create a cache with a specific default TTL
    pub fn with_default_ttl(default_ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            default_ttl,
        }
    }

    /// Number of unexpired entries currently stored
    pub fn len(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| !entry.value().is_expired())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryCacheStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStrategy for InMemoryCacheStrategy {
    async fn add_if_absent(&self, key: &str, value: Value, ttl: Duration) -> CacheResult<bool> {
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_expired() {
                    occupied.insert(CacheEntry::new(value, ttl));
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(CacheEntry::new(value, ttl));
                Ok(true)
            }
        }
    }

    async fn get(&self, key: &str) -> CacheResult<Option<Value>> {
        match self.entries.get(key) {
            Some(entry) if !entry.is_expired() => Ok(Some(entry.value.clone())),
            _ => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> CacheResult<()> {
        let ttl = ttl.unwrap_or(self.default_ttl);
        self.entries
            .insert(key.to_string(), CacheEntry::new(value, ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_set_and_get_round_trip() {
        let cache = InMemoryCacheStrategy::new();
        cache.set("key", json!({"a": 1}), None).await.unwrap();
        assert_eq!(cache.get("key").await.unwrap(), Some(json!({"a": 1})));
    }

    #[tokio::test]
    async fn test_get_missing_key_returns_none() {
        let cache = InMemoryCacheStrategy::new();
        assert_eq!(cache.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let cache = InMemoryCacheStrategy::new();
        cache
            .set("key", json!(1), Some(Duration::from_millis(50)))
            .await
            .unwrap();
        assert!(cache.get("key").await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(cache.get("key").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_add_if_absent_refuses_existing_key() {
        let cache = InMemoryCacheStrategy::new();
        assert!(cache
            .add_if_absent("lock", json!(1), Duration::from_secs(60))
            .await
            .unwrap());
        assert!(!cache
            .add_if_absent("lock", json!(1), Duration::from_secs(60))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_add_if_absent_replaces_expired_entry() {
        let cache = InMemoryCacheStrategy::new();
        assert!(cache
            .add_if_absent("lock", json!(1), Duration::from_millis(50))
            .await
            .unwrap());

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(cache
            .add_if_absent("lock", json!(2), Duration::from_secs(60))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let cache = InMemoryCacheStrategy::new();
        cache.set("key", json!(1), None).await.unwrap();
        cache.delete("key").await.unwrap();
        cache.delete("key").await.unwrap();
        assert_eq!(cache.get("key").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_add_if_absent_is_atomic_under_concurrency() {
        let cache = Arc::new(InMemoryCacheStrategy::new());
        let mut handles = Vec::new();

        for i in 0..32 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move {
                cache
                    .add_if_absent("contended", json!(i), Duration::from_secs(60))
                    .await
                    .unwrap()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }

        assert_eq!(winners, 1, "exactly one concurrent caller may create the entry");
    }
}
