use std::time::Duration;

use ccplane_cache::L1Cache;

use crate::heartbeat::IngestResult;

/// Tracks the last-seen `(instanceId, configHash)` tuple so two identical
/// heartbeats within `dedupWindow` collapse to a single write (spec.md
/// §4.1 "Idempotence"). Deliberately process-local: the window is a few
/// seconds and re-sending on the next ping cycle is harmless, so this
/// doesn't need the cache fabric's L2 tier.
#[derive(Clone)]
pub struct DedupCache {
    entries: L1Cache<(String, IngestResult)>,
    window: Duration,
}

impl DedupCache {
    pub fn new(window: Duration) -> Self {
        Self { entries: L1Cache::new(50_000), window }
    }

    /// If the same `(instance_id, config_hash)` was seen inside the window,
    /// returns the previously-computed result to replay instead of
    /// re-running the pipeline.
    pub async fn check(&self, instance_id: &str, config_hash: &str) -> Option<IngestResult> {
        match self.entries.get(instance_id).await {
            Some((hash, result)) if hash == config_hash => Some(result),
            _ => None,
        }
    }

    pub async fn record(&self, instance_id: &str, config_hash: &str, result: IngestResult) {
        self.entries.put(instance_id.to_string(), (config_hash.to_string(), result), self.window).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heartbeat::IngestOutcome;

    #[tokio::test]
    async fn identical_hash_within_window_replays_the_cached_result() {
        let dedup = DedupCache::new(Duration::from_secs(5));
        let result = IngestResult { outcome: IngestOutcome::Healthy, drift_detected: false };
        dedup.record("i-1", "aaaa", result.clone()).await;
        let replayed = dedup.check("i-1", "aaaa").await;
        assert!(replayed.is_some());
    }

    #[tokio::test]
    async fn different_hash_is_not_deduped() {
        let dedup = DedupCache::new(Duration::from_secs(5));
        let result = IngestResult { outcome: IngestOutcome::Healthy, drift_detected: false };
        dedup.record("i-1", "aaaa", result).await;
        assert!(dedup.check("i-1", "bbbb").await.is_none());
    }

    #[tokio::test]
    async fn entry_expires_after_the_window() {
        let dedup = DedupCache::new(Duration::from_millis(0));
        let result = IngestResult { outcome: IngestOutcome::Healthy, drift_detected: false };
        dedup.record("i-1", "aaaa", result).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(dedup.check("i-1", "aaaa").await.is_none());
    }
}
