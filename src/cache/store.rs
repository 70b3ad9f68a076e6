//! Key-value store backends shared by both caches.
//!
//! # Design Decisions
//! - One narrow trait: get / put-with-TTL / delete over raw bytes
//! - TTL enforcement belongs to the backend, not to callers
//! - Writes are idempotent upserts; concurrent last-writer-wins races are
//!   accepted because values for a key are equivalent once inputs are

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use redis::AsyncCommands;
use thiserror::Error;

/// Errors from a store backend. Callers treat read failures as misses and
/// swallow write failures; these never reach clients.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Byte-oriented key-value store with per-entry TTL.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    async fn put(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<(), StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// Process-local store for tests and single-node deployments.
///
/// Expired entries are dropped lazily on read.
#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<String, (Vec<u8>, Option<Instant>)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a live (unexpired) entry exists. Test helper.
    pub fn contains(&self, key: &str) -> bool {
        match self.entries.get(key) {
            Some(entry) => entry.1.map(|deadline| Instant::now() < deadline).unwrap_or(true),
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        if let Some(entry) = self.entries.get(key) {
            let (value, deadline) = entry.value();
            if deadline.map(|d| Instant::now() < d).unwrap_or(true) {
                return Ok(Some(value.clone()));
            }
        } else {
            return Ok(None);
        }
        // Entry exists but expired.
        self.entries.remove(key);
        Ok(None)
    }

    async fn put(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<(), StoreError> {
        let deadline = ttl.map(|t| Instant::now() + t);
        self.entries.insert(key.to_string(), (value, deadline));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Shared Redis store for multi-instance deployments.
#[derive(Clone)]
pub struct RedisStore {
    manager: redis::aio::ConnectionManager,
}

impl RedisStore {
    /// Connect and build a self-reconnecting connection manager.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client =
            redis::Client::open(url).map_err(|e| StoreError::Backend(e.to_string()))?;
        let manager = redis::aio::ConnectionManager::new(client)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(Self { manager })
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let mut conn = self.manager.clone();
        conn.get(key)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn put(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<(), StoreError> {
        let mut conn = self.manager.clone();
        match ttl {
            Some(ttl) => conn
                .set_ex(key, value, ttl.as_secs().max(1))
                .await
                .map_err(|e| StoreError::Backend(e.to_string())),
            None => conn
                .set(key, value)
                .await
                .map_err(|e| StoreError::Backend(e.to_string())),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.manager.clone();
        conn.del(key)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))
    }
}

/// Build the configured store backend.
pub async fn build_store(
    config: &crate::config::schema::StoreConfig,
) -> Result<Arc<dyn KeyValueStore>, StoreError> {
    match config.backend {
        crate::config::StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        crate::config::StoreBackend::Redis => {
            Ok(Arc::new(RedisStore::connect(&config.redis_url).await?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_roundtrip() {
        let store = MemoryStore::new();
        store.put("k", b"value".to_vec(), None).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().unwrap(), b"value");
        store.delete("k").await.unwrap();
        assert!(store.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_ttl_expiry() {
        let store = MemoryStore::new();
        store
            .put("k", b"v".to_vec(), Some(Duration::from_millis(10)))
            .await
            .unwrap();
        assert!(store.get("k").await.unwrap().is_some());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(store.get("k").await.unwrap().is_none());
        assert!(!store.contains("k"));
    }

    #[tokio::test]
    async fn test_memory_upsert_overwrites() {
        let store = MemoryStore::new();
        store.put("k", b"one".to_vec(), None).await.unwrap();
        store.put("k", b"two".to_vec(), None).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().unwrap(), b"two");
    }
}
