use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use crate::entry::Entry;

#[derive(Debug, Default)]
struct Inner<V> {
    entries: HashMap<String, Entry<V>>,
}

/// In-process, TTL- and size-bounded cache tier (spec.md §4.5 L1). Grounded
/// on the teacher's `Arc<RwLock<HashMap>>` store idiom: readers and writers
/// never hold the lock across I/O, matching the "safe for concurrent
/// reads/writes" shared-resource policy.
#[derive(Debug, Clone)]
pub struct L1Cache<V> {
    inner: Arc<RwLock<Inner<V>>>,
    max_entries: usize,
}

impl<V: Clone> L1Cache<V> {
    pub fn new(max_entries: usize) -> Self {
        Self { inner: Arc::new(RwLock::new(Inner { entries: HashMap::new() })), max_entries }
    }

    pub async fn get(&self, key: &str) -> Option<V> {
        let guard = self.inner.read().await;
        match guard.entries.get(key) {
            Some(entry) if !entry.is_expired() => Some(entry.value.clone()),
            _ => None,
        }
    }

    pub async fn put(&self, key: String, value: V, ttl: Duration) {
        let mut guard = self.inner.write().await;
        if guard.entries.len() >= self.max_entries && !guard.entries.contains_key(&key) {
            // no true LRU; drop one arbitrary expired-or-oldest entry to stay
            // within budget rather than grow unbounded.
            if let Some(evict_key) = guard
                .entries
                .iter()
                .find(|(_, e)| e.is_expired())
                .map(|(k, _)| k.clone())
                .or_else(|| guard.entries.keys().next().cloned())
            {
                guard.entries.remove(&evict_key);
            }
        }
        guard.entries.insert(key, Entry::new(value, ttl));
    }

    pub async fn invalidate(&self, key: &str) {
        let mut guard = self.inner.write().await;
        guard.entries.remove(key);
    }

    pub async fn clear(&self) {
        let mut guard = self.inner.write().await;
        guard.entries.clear();
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }
}
