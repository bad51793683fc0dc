use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::entry::Entry;
use crate::error::CacheError;

/// Optional distributed tier (spec.md §4.5 L2). Stores opaque serialized
/// strings — the two-level composite handles (de)serialization of the
/// typed value on top of this port, the same layering the teacher uses for
/// its persistence repository ports.
#[async_trait]
pub trait L2Cache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;
    async fn invalidate(&self, key: &str) -> Result<(), CacheError>;
    async fn clear_prefix(&self, prefix: &str) -> Result<(), CacheError>;
}

/// In-memory fake used by tests and by deployments that run a single
/// replica without a real distributed cache.
#[derive(Debug, Default, Clone)]
pub struct InMemoryL2Cache {
    inner: Arc<RwLock<HashMap<String, Entry<String>>>>,
}

impl InMemoryL2Cache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl L2Cache for InMemoryL2Cache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let guard = self.inner.read().await;
        Ok(match guard.get(key) {
            Some(entry) if !entry.is_expired() => Some(entry.value.clone()),
            _ => None,
        })
    }

    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let mut guard = self.inner.write().await;
        guard.insert(key.to_string(), Entry::new(value, ttl));
        Ok(())
    }

    async fn invalidate(&self, key: &str) -> Result<(), CacheError> {
        let mut guard = self.inner.write().await;
        guard.remove(key);
        Ok(())
    }

    async fn clear_prefix(&self, prefix: &str) -> Result<(), CacheError> {
        let mut guard = self.inner.write().await;
        guard.retain(|k, _| !k.starts_with(prefix));
        Ok(())
    }
}

#[cfg(feature = "redis-backend")]
mod redis_backend {
    use super::*;
    use redis::AsyncCommands;

    /// L2 backed by a real Redis deployment, grounded on the `redis` crate's
    /// use as a shared-cache backend elsewhere in the retrieval pack
    /// (`hack-ink-jwks-cache`). Keys are namespaced by the caller.
    pub struct RedisL2Cache {
        manager: redis::aio::ConnectionManager,
    }

    impl RedisL2Cache {
        pub async fn connect(url: &str) -> Result<Self, CacheError> {
            let client = redis::Client::open(url).map_err(|e| CacheError::Backend(e.to_string()))?;
            let manager = client
                .get_connection_manager()
                .await
                .map_err(|e| CacheError::Backend(e.to_string()))?;
            Ok(Self { manager })
        }
    }

    #[async_trait]
    impl L2Cache for RedisL2Cache {
        async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
            let mut conn = self.manager.clone();
            conn.get(key).await.map_err(|e| CacheError::Backend(e.to_string()))
        }

        async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
            let mut conn = self.manager.clone();
            conn.set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1))
                .await
                .map_err(|e| CacheError::Backend(e.to_string()))
        }

        async fn invalidate(&self, key: &str) -> Result<(), CacheError> {
            let mut conn = self.manager.clone();
            conn.del::<_, ()>(key).await.map_err(|e| CacheError::Backend(e.to_string()))
        }

        async fn clear_prefix(&self, prefix: &str) -> Result<(), CacheError> {
            let mut conn = self.manager.clone();
            let pattern = format!("{prefix}*");
            let keys: Vec<String> =
                conn.keys(pattern).await.map_err(|e| CacheError::Backend(e.to_string()))?;
            if !keys.is_empty() {
                conn.del::<_, ()>(keys).await.map_err(|e| CacheError::Backend(e.to_string()))?;
            }
            Ok(())
        }
    }
}

#[cfg(feature = "redis-backend")]
pub use redis_backend::RedisL2Cache;
