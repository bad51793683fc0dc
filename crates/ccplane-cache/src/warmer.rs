use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::registry::{expected_hash_key, CacheRegistry};

/// Read-only view over the service catalog the pre-warmer iterates
/// (`serviceId` × `environment` pairs). The ingest/store crates supply the
/// real implementation; this port keeps the cache fabric from depending on
/// the persistence layer directly.
#[async_trait]
pub trait ServiceEnvironmentSource: Send + Sync {
    async fn list_service_environments(&self) -> Vec<(String, String)>;
}

/// Fetches the expected hash for one `(serviceId, environment)` pair, used
/// only to populate the cache ahead of the first heartbeat.
#[async_trait]
pub trait ExpectedHashSource: Send + Sync {
    async fn fetch_expected_hash(&self, service_id: &str, environment: &str) -> Option<String>;
}

/// Runs once at startup, after `warmupDelay` (default 30s), iterating all
/// `ApplicationService` × environment pairs and populating `expected-hash`
/// (spec.md §4.5). Failures are logged and never block readiness — the
/// warmer is strictly best-effort.
pub struct CachePreWarmer<S, H> {
    services: S,
    hashes: H,
    warmup_delay: Duration,
}

impl<S, H> CachePreWarmer<S, H>
where
    S: ServiceEnvironmentSource,
    H: ExpectedHashSource,
{
    pub fn new(services: S, hashes: H, warmup_delay: Duration) -> Self {
        Self { services, hashes, warmup_delay }
    }

    pub async fn run(&self, registry: &CacheRegistry) {
        tokio::time::sleep(self.warmup_delay).await;
        let pairs = self.services.list_service_environments().await;
        let mut warmed = 0usize;
        let mut failed = 0usize;
        for (service_id, environment) in pairs {
            match self.hashes.fetch_expected_hash(&service_id, &environment).await {
                Some(hash) => {
                    registry
                        .expected_hash
                        .put(expected_hash_key(&service_id, &environment), &hash)
                        .await;
                    warmed += 1;
                }
                None => {
                    warn!(service_id, environment, "cache pre-warm could not fetch expected hash");
                    failed += 1;
                }
            }
        }
        info!(warmed, failed, "cache pre-warm complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::CacheTtls;
    use std::sync::Mutex;

    struct FixedServices(Vec<(String, String)>);

    #[async_trait]
    impl ServiceEnvironmentSource for FixedServices {
        async fn list_service_environments(&self) -> Vec<(String, String)> {
            self.0.clone()
        }
    }

    struct FixedHashes(Mutex<std::collections::HashMap<String, String>>);

    #[async_trait]
    impl ExpectedHashSource for FixedHashes {
        async fn fetch_expected_hash(&self, service_id: &str, environment: &str) -> Option<String> {
            self.0.lock().unwrap().get(&format!("{service_id}:{environment}")).cloned()
        }
    }

    #[tokio::test]
    async fn warms_the_expected_hash_cache_for_every_pair() {
        let services = FixedServices(vec![("svc_a".to_string(), "prod".to_string())]);
        let mut map = std::collections::HashMap::new();
        map.insert("svc_a:prod".to_string(), "hash1".to_string());
        let hashes = FixedHashes(Mutex::new(map));
        let warmer = CachePreWarmer::new(services, hashes, Duration::from_millis(0));
        let registry = CacheRegistry::new(CacheTtls::default(), None);

        warmer.run(&registry).await;

        assert_eq!(
            registry.expected_hash.get(&expected_hash_key("svc_a", "prod")).await,
            Some("hash1".to_string())
        );
    }

    #[tokio::test]
    async fn missing_hash_is_logged_and_does_not_panic() {
        let services = FixedServices(vec![("svc_b".to_string(), "dev".to_string())]);
        let hashes = FixedHashes(Mutex::new(std::collections::HashMap::new()));
        let warmer = CachePreWarmer::new(services, hashes, Duration::from_millis(0));
        let registry = CacheRegistry::new(CacheTtls::default(), None);

        warmer.run(&registry).await;

        assert_eq!(registry.expected_hash.get(&expected_hash_key("svc_b", "dev")).await, None);
    }
}
