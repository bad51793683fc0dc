use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::error::CacheError;
use crate::l1::L1Cache;
use crate::l2::L2Cache;
use crate::metrics::CacheMetrics;

/// Read L1 → miss → read L2 → on hit promote to L1; write L1 always and L2
/// when write-through is enabled (spec.md §4.5). L2 is optional: when absent,
/// L1 serves alone.
pub struct TwoLevelCache<V> {
    name: String,
    l1: L1Cache<String>,
    l2: Option<Arc<dyn L2Cache>>,
    write_through: bool,
    ttl: Duration,
    metrics: CacheMetrics,
    _marker: PhantomData<V>,
}

impl<V: Serialize + DeserializeOwned + Clone + Send + Sync> TwoLevelCache<V> {
    pub fn new(name: impl Into<String>, ttl: Duration, l2: Option<Arc<dyn L2Cache>>) -> Self {
        Self {
            name: name.into(),
            l1: L1Cache::new(10_000),
            l2,
            write_through: true,
            ttl,
            metrics: CacheMetrics::default(),
            _marker: PhantomData,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    pub async fn get(&self, key: &str) -> Option<V> {
        if let Some(raw) = self.l1.get(key).await {
            self.metrics.record_l1_hit();
            return self.decode(&raw);
        }
        self.metrics.record_l1_miss();

        let Some(l2) = &self.l2 else {
            self.metrics.record_miss();
            return None;
        };
        match l2.get(key).await {
            Ok(Some(raw)) => {
                self.metrics.record_l2_hit();
                self.l1.put(key.to_string(), raw.clone(), self.ttl).await;
                self.decode(&raw)
            }
            Ok(None) => {
                self.metrics.record_miss();
                None
            }
            Err(e) => {
                warn!(cache = %self.name, error = %e, "L2 read failed, treating as miss");
                self.metrics.record_error();
                None
            }
        }
    }

    pub async fn put(&self, key: String, value: &V) {
        let Ok(raw) = serde_json::to_string(value) else {
            warn!(cache = %self.name, "failed to serialize cache value, skipping write");
            return;
        };
        self.l1.put(key.clone(), raw.clone(), self.ttl).await;
        if self.write_through {
            if let Some(l2) = &self.l2 {
                if let Err(e) = l2.put(&key, raw, self.ttl).await {
                    warn!(cache = %self.name, error = %e, "L2 write failed");
                    self.metrics.record_error();
                }
            }
        }
    }

    /// Evicts `key` from both tiers, per the "eviction of a key removes it
    /// from both tiers" rule.
    pub async fn invalidate(&self, key: &str) {
        self.l1.invalidate(key).await;
        if let Some(l2) = &self.l2 {
            if let Err(e) = l2.invalidate(key).await {
                warn!(cache = %self.name, error = %e, "L2 invalidate failed");
                self.metrics.record_error();
            }
        }
    }

    pub async fn clear(&self) {
        self.l1.clear().await;
        if let Some(l2) = &self.l2 {
            if let Err(e) = l2.clear_prefix("").await {
                warn!(cache = %self.name, error = %e, "L2 clear failed");
                self.metrics.record_error();
            }
        }
    }

    fn decode(&self, raw: &str) -> Option<V> {
        match serde_json::from_str(raw) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(cache = %self.name, error = %e, "failed to deserialize cached value");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hits_l1_on_second_read() {
        let cache: TwoLevelCache<String> = TwoLevelCache::new("expected-hash", Duration::from_secs(60), None);
        cache.put("svc_a:prod".to_string(), &"hash1".to_string()).await;
        assert_eq!(cache.get("svc_a:prod").await, Some("hash1".to_string()));
        assert_eq!(cache.metrics().l1_hits(), 1);
    }

    #[tokio::test]
    async fn promotes_l2_hit_to_l1() {
        use crate::l2::InMemoryL2Cache;
        let l2 = Arc::new(InMemoryL2Cache::new());
        let cache: TwoLevelCache<String> =
            TwoLevelCache::new("expected-hash", Duration::from_secs(60), Some(l2.clone()));
        l2.put("svc_a:prod", serde_json::to_string("hash1").unwrap(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.get("svc_a:prod").await, Some("hash1".to_string()));
        assert_eq!(cache.metrics().l2_hits(), 1);
        // now present in L1 without touching L2 again
        assert_eq!(cache.get("svc_a:prod").await, Some("hash1".to_string()));
        assert_eq!(cache.metrics().l1_hits(), 1);
    }

    #[tokio::test]
    async fn invalidate_clears_both_tiers() {
        use crate::l2::InMemoryL2Cache;
        let l2 = Arc::new(InMemoryL2Cache::new());
        let cache: TwoLevelCache<String> =
            TwoLevelCache::new("expected-hash", Duration::from_secs(60), Some(l2.clone()));
        cache.put("svc_a:prod".to_string(), &"hash1".to_string()).await;
        cache.invalidate("svc_a:prod").await;
        assert_eq!(cache.get("svc_a:prod").await, None);
    }
}
