//! Content-addressed answer cache.
//!
//! Entries are whole [`QueryResponse`] values keyed by a digest of the
//! question and its supporting context. The store is an injection seam:
//! [`RedisCache`] is the production backend, [`MemoryCache`] serves tests and
//! deployments without a Redis instance. Either way the pipeline only sees
//! [`CacheStore`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::AsyncCommands;
use sha2::{Digest, Sha256};

use crate::error::CacheError;
use crate::types::QueryResponse;

/// Keys under this prefix belong to the answer cache; `clear` only ever
/// touches this namespace.
const NAMESPACE: &str = "rag_cache:";

/// Digest identifying one (query, context) pair. Hex SHA-256, so stored keys
/// never expose readable query text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derive the cache key for a query and its supporting chunks.
///
/// Leading/trailing whitespace never changes the key, and neither does chunk
/// order: the same chunks retrieved in a different order must reuse the same
/// cached answer. Every field is hashed behind a length prefix so that
/// ("ab", "c") and ("a", "bc") stay distinct.
pub fn derive_key(query: &str, context_chunks: &[String]) -> CacheKey {
    let mut hasher = Sha256::new();
    let query = query.trim();
    hasher.update((query.len() as u64).to_be_bytes());
    hasher.update(query.as_bytes());

    let mut chunks: Vec<&str> = context_chunks.iter().map(|c| c.trim()).collect();
    chunks.sort_unstable();
    for chunk in chunks {
        hasher.update((chunk.len() as u64).to_be_bytes());
        hasher.update(chunk.as_bytes());
    }

    CacheKey(format!("{:x}", hasher.finalize()))
}

#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Entry for `key`, unless absent or expired.
    async fn get(&self, key: &CacheKey) -> Result<Option<QueryResponse>, CacheError>;

    /// Store `entry` under `key`, overwriting any prior entry.
    async fn set(
        &self,
        key: &CacheKey,
        entry: &QueryResponse,
        ttl: Duration,
    ) -> Result<(), CacheError>;

    /// Drop every entry in the cache namespace. Test isolation only.
    async fn clear(&self) -> Result<(), CacheError>;
}

// ============================
// Redis backend
// ============================

/// Redis-backed store. Entries are JSON strings under namespaced keys and
/// expiry rides on the Redis `EX` option.
pub struct RedisCache {
    client: redis::Client,
}

impl RedisCache {
    pub fn open(url: &str) -> Result<Self, CacheError> {
        Ok(Self {
            client: redis::Client::open(url)?,
        })
    }

    fn storage_key(key: &CacheKey) -> String {
        format!("{NAMESPACE}{key}")
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<QueryResponse>, CacheError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let raw: Option<String> = conn.get(Self::storage_key(key)).await?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn set(
        &self,
        key: &CacheKey,
        entry: &QueryResponse,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let json = serde_json::to_string(entry)?;
        let _: () = conn
            .set_ex(Self::storage_key(key), json, ttl.as_secs())
            .await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), CacheError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let mut keys: Vec<String> = Vec::new();
        {
            let mut iter: redis::AsyncIter<String> =
                conn.scan_match(format!("{NAMESPACE}*")).await?;
            while let Some(key) = iter.next_item().await {
                keys.push(key);
            }
        }
        if !keys.is_empty() {
            let _: () = conn.del(keys).await?;
        }
        Ok(())
    }
}

// ============================
// In-process backend
// ============================

/// In-process store used when no Redis backend is configured, and by tests.
/// Entries expire lazily on read.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<CacheKey, (QueryResponse, Instant)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<CacheKey, (QueryResponse, Instant)>> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<QueryResponse>, CacheError> {
        let mut entries = self.lock();
        match entries.get(key) {
            Some((_, deadline)) if *deadline <= Instant::now() => {
                entries.remove(key);
                Ok(None)
            }
            Some((entry, _)) => Ok(Some(entry.clone())),
            None => Ok(None),
        }
    }

    async fn set(
        &self,
        key: &CacheKey,
        entry: &QueryResponse,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        self.lock()
            .insert(key.clone(), (entry.clone(), Instant::now() + ttl));
        Ok(())
    }

    async fn clear(&self) -> Result<(), CacheError> {
        self.lock().clear();
        Ok(())
    }
}
