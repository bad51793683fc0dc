use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ccplane_cache::{expected_hash_key, CacheRegistry};
use ccplane_domain::{
    Actor, ApplicationService, DriftEvent, DriftSeverity, InstanceId, InstanceStatus, ServiceId,
    ServiceInstance,
};
use ccplane_resilience::CircuitBreaker;
use ccplane_store::{ApplicationServiceRepository, DriftEventRepository, ServiceInstanceRepository};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::dedup::DedupCache;
use crate::error::IngestError;
use crate::ports::{CsotAdapter, RefreshPublisher};

/// The inbound JSON payload (spec.md §6): `{serviceName, instanceId,
/// configHash, host?, port?, environment, version?, metadata?}`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatPayload {
    pub service_name: String,
    pub instance_id: String,
    pub config_hash: String,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub environment: String,
    pub version: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IngestOutcome {
    Healthy,
    Drift,
    Unknown,
}

/// What `HeartbeatService::ingest` hands back — `drift_detected` reflects
/// the instance's *current* drift state, not only newly-opened episodes
/// (spec.md §6: "Success means the heartbeat was accepted and persisted,
/// independent of drift outcome").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResult {
    pub outcome: IngestOutcome,
    pub drift_detected: bool,
}

/// Tunables this crate needs from configuration, passed in explicitly so
/// `ccplane-ingest` stays a leaf crate (spec.md §9 "explicit construction
/// instead of dynamic DI").
#[derive(Debug, Clone)]
pub struct HeartbeatServiceConfig {
    pub auto_register_on_first_heartbeat: bool,
    pub prod_environment_names: Vec<String>,
}

impl HeartbeatServiceConfig {
    pub fn is_prod(&self, environment: &str) -> bool {
        self.prod_environment_names.iter().any(|e| e.eq_ignore_ascii_case(environment))
    }
}

/// Ingestion + drift-classification pipeline (spec.md §4.1). One instance
/// is shared across the process; callers serialize per-instance updates
/// through `crate::lock::InstanceLocks` one layer up in
/// `IngestOrchestrator`.
pub struct HeartbeatService<Services, Instances, Drifts> {
    services: Arc<Services>,
    instances: Arc<Instances>,
    drifts: Arc<Drifts>,
    cache: Arc<CacheRegistry>,
    csot: Arc<dyn CsotAdapter>,
    bus: Arc<dyn RefreshPublisher>,
    breaker: CircuitBreaker,
    dedup: DedupCache,
    config: HeartbeatServiceConfig,
    csot_fallback_used: AtomicU64,
}

impl<Services, Instances, Drifts> HeartbeatService<Services, Instances, Drifts>
where
    Services: ApplicationServiceRepository,
    Instances: ServiceInstanceRepository,
    Drifts: DriftEventRepository,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        services: Arc<Services>,
        instances: Arc<Instances>,
        drifts: Arc<Drifts>,
        cache: Arc<CacheRegistry>,
        csot: Arc<dyn CsotAdapter>,
        bus: Arc<dyn RefreshPublisher>,
        breaker: CircuitBreaker,
        dedup_window: std::time::Duration,
        config: HeartbeatServiceConfig,
    ) -> Self {
        Self {
            services,
            instances,
            drifts,
            cache,
            csot,
            bus,
            breaker,
            dedup: DedupCache::new(dedup_window),
            config,
            csot_fallback_used: AtomicU64::new(0),
        }
    }

    pub fn csot_fallback_used_count(&self) -> u64 {
        self.csot_fallback_used.load(Ordering::Relaxed)
    }

    #[instrument(skip(self, payload), fields(service_name = %payload.service_name, instance_id = %payload.instance_id))]
    pub async fn ingest(&self, payload: HeartbeatPayload) -> Result<IngestResult, IngestError> {
        if let Some(cached) = self.dedup.check(&payload.instance_id, &payload.config_hash).await {
            return Ok(cached);
        }

        let now = Utc::now();
        let service = self.resolve_service(&payload.service_name, &payload.environment, now).await?;
        let service_id = service.id.clone();
        let instance_id = InstanceId::new(payload.instance_id.clone());

        let expected_hash = self.lookup_expected_hash(&service_id, &payload.environment).await;

        let mut instance = self
            .instances
            .get(&service_id, &instance_id)
            .await?
            .unwrap_or_else(|| ServiceInstance::new(service_id.clone(), instance_id.clone(), payload.environment.clone(), now));

        instance.host = payload.host.clone();
        instance.port = payload.port;
        instance.version = payload.version.clone();
        instance.applied_hash = Some(payload.config_hash.clone());
        instance.metadata = payload.metadata.clone();
        instance.environment = payload.environment.clone();
        instance.last_seen_at = now;
        instance.updated_at = now;

        let mut newly_detected = false;
        let outcome = match &expected_hash {
            None => {
                instance.status = InstanceStatus::Unknown;
                instance.has_drift = false;
                IngestOutcome::Unknown
            }
            Some(expected) if *expected == payload.config_hash => {
                if let Some(mut open) = self.drifts.find_open(&service_id, &instance_id).await? {
                    open.resolve(Actor::system(), now);
                    self.drifts.upsert(&open).await?;
                }
                instance.status = InstanceStatus::Healthy;
                instance.has_drift = false;
                instance.drift_detected_at = None;
                IngestOutcome::Healthy
            }
            Some(expected) => {
                match self.drifts.find_open(&service_id, &instance_id).await? {
                    Some(mut open) => {
                        open.applied_hash = payload.config_hash.clone();
                        self.drifts.upsert(&open).await?;
                    }
                    None => {
                        let severity = if self.config.is_prod(&payload.environment) {
                            DriftSeverity::High
                        } else {
                            DriftSeverity::Medium
                        };
                        let event = DriftEvent::open(
                            service_id.clone(),
                            instance_id.clone(),
                            service.owner_team_id.clone(),
                            expected.clone(),
                            payload.config_hash.clone(),
                            severity,
                            Actor::system(),
                            now,
                        );
                        self.drifts.upsert(&event).await?;
                        newly_detected = true;
                    }
                }
                instance.status = InstanceStatus::Drift;
                instance.has_drift = true;
                instance.drift_detected_at = Some(now);
                IngestOutcome::Drift
            }
        };

        self.instances.upsert(&instance).await?;

        if newly_detected {
            self.publish_refresh(&service_id, &instance_id).await;
        }

        let result = IngestResult { outcome, drift_detected: instance.has_drift };
        self.dedup.record(&payload.instance_id, &payload.config_hash, result.clone()).await;
        Ok(result)
    }

    async fn resolve_service(&self, service_name: &str, environment: &str, now: chrono::DateTime<Utc>) -> Result<ApplicationService, IngestError> {
        if let Some(id) = self.cache.service_resolution.get(service_name).await {
            if let Some(svc) = self.services.get(&ServiceId::new(id)).await? {
                return Ok(svc);
            }
        }

        if let Some(svc) = self.services.get_by_display_name(service_name).await? {
            self.cache.service_resolution.put(service_name.to_string(), &svc.id.0).await;
            return Ok(svc);
        }
        if let Some(svc) = self.services.get(&ServiceId::new(service_name)).await? {
            self.cache.service_resolution.put(service_name.to_string(), &svc.id.0).await;
            return Ok(svc);
        }

        if !self.config.auto_register_on_first_heartbeat {
            return Err(IngestError::UnknownService(service_name.to_string()));
        }

        let svc = ApplicationService::new(ServiceId::new(service_name), service_name, vec![environment.to_string()], Actor::system(), now);
        self.services.upsert(&svc).await?;
        self.cache.service_resolution.put(service_name.to_string(), &svc.id.0).await;
        info!(service_id = %svc.id, "auto-registered service on first heartbeat");
        Ok(svc)
    }

    /// L1 → L2 → CSoT adapter, with the `csot-fallback` cache serving
    /// degraded reads when the CSoT is unreachable (spec.md §4.5).
    async fn lookup_expected_hash(&self, service_id: &ServiceId, environment: &str) -> Option<String> {
        let key = expected_hash_key(service_id.as_str(), environment);
        if let Some(hash) = self.cache.expected_hash.get(&key).await {
            return Some(hash);
        }

        match self.csot.fetch_expected_hash(service_id.as_str(), environment).await {
            Ok(Some(hash)) => {
                self.cache.expected_hash.put(key.clone(), &hash).await;
                self.cache.csot_fallback.put(key, &hash).await;
                Some(hash)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(service_id = %service_id, environment, error = %e, "CSoT unavailable, trying fallback cache");
                match self.cache.csot_fallback.get(&key).await {
                    Some(hash) => {
                        self.csot_fallback_used.fetch_add(1, Ordering::Relaxed);
                        Some(hash)
                    }
                    None => None,
                }
            }
        }
    }

    async fn publish_refresh(&self, service_id: &ServiceId, instance_id: &InstanceId) {
        let destination = format!("{service_id}:{instance_id}");
        let bus = self.bus.clone();
        let outcome = self.breaker.call(move || async move { bus.publish(&destination).await }).await;
        if let Err(e) = outcome {
            warn!(service_id = %service_id, instance_id = %instance_id, error = %e, "refresh publish dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::fakes::{FakeCsot, RecordingBus};
    use ccplane_cache::CacheTtls;
    use ccplane_domain::DriftStatus;
    use ccplane_store::InMemoryStore;
    use std::time::Duration;

    fn config() -> HeartbeatServiceConfig {
        HeartbeatServiceConfig { auto_register_on_first_heartbeat: false, prod_environment_names: vec!["prod".to_string()] }
    }

    async fn harness() -> (
        Arc<InMemoryStore>,
        Arc<FakeCsot>,
        Arc<RecordingBus>,
        Arc<CacheRegistry>,
        HeartbeatService<InMemoryStore, InMemoryStore, InMemoryStore>,
    ) {
        let store = Arc::new(InMemoryStore::new());
        let csot = Arc::new(FakeCsot::new());
        let bus = Arc::new(RecordingBus::new());
        let cache = Arc::new(CacheRegistry::new(CacheTtls::default(), None));
        let svc = HeartbeatService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            cache.clone(),
            csot.clone(),
            bus.clone(),
            CircuitBreaker::new(5, Duration::from_secs(30)),
            Duration::from_secs(5),
            config(),
        );
        (store, csot, bus, cache, svc)
    }

    fn payload(hash: &str) -> HeartbeatPayload {
        HeartbeatPayload {
            service_name: "svc_payments".to_string(),
            instance_id: "i-1".to_string(),
            config_hash: hash.to_string(),
            host: None,
            port: None,
            environment: "dev".to_string(),
            version: None,
            metadata: HashMap::new(),
        }
    }

    async fn seed_service(store: &InMemoryStore) {
        let svc = ApplicationService::new(ServiceId::new("svc_payments"), "payments", vec!["dev".to_string()], Actor::system(), Utc::now());
        store.upsert(&svc).await.unwrap();
    }

    #[tokio::test]
    async fn unknown_service_is_rejected_without_auto_register() {
        let (_store, csot, _bus, _cache, svc) = harness().await;
        csot.set("svc_payments", "dev", "aaaa");
        let err = svc.ingest(payload("aaaa")).await.unwrap_err();
        assert!(matches!(err, IngestError::UnknownService(_)));
    }

    #[tokio::test]
    async fn matching_hash_is_healthy_with_no_drift() {
        let (store, csot, bus, _cache, svc) = harness().await;
        seed_service(&store).await;
        csot.set("svc_payments", "dev", "aaaa");

        let result = svc.ingest(payload("aaaa")).await.unwrap();
        assert_eq!(result.outcome, IngestOutcome::Healthy);
        assert!(!result.drift_detected);
        assert!(bus.messages().is_empty());

        let instance = store.get(&ServiceId::new("svc_payments"), &InstanceId::new("i-1")).await.unwrap().unwrap();
        assert_eq!(instance.status, InstanceStatus::Healthy);
    }

    #[tokio::test]
    async fn mismatched_hash_opens_drift_and_publishes_refresh() {
        let (store, csot, bus, _cache, svc) = harness().await;
        seed_service(&store).await;
        csot.set("svc_payments", "dev", "aaaa");

        let result = svc.ingest(payload("bbbb")).await.unwrap();
        assert_eq!(result.outcome, IngestOutcome::Drift);
        assert!(result.drift_detected);
        assert_eq!(bus.messages(), vec!["svc_payments:i-1".to_string()]);

        let open = store
            .find_open(&ServiceId::new("svc_payments"), &InstanceId::new("i-1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(open.status, DriftStatus::Detected);
    }

    #[tokio::test]
    async fn matching_hash_after_drift_resolves_the_open_event() {
        let (store, csot, bus, _cache, svc) = harness().await;
        seed_service(&store).await;
        csot.set("svc_payments", "dev", "aaaa");

        svc.ingest(payload("bbbb")).await.unwrap();
        let result = svc.ingest(payload("aaaa")).await.unwrap();
        assert_eq!(result.outcome, IngestOutcome::Healthy);
        assert!(!result.drift_detected);
        // only one refresh published — the second heartbeat didn't reopen it
        assert_eq!(bus.messages().len(), 1);

        let open = store.find_open(&ServiceId::new("svc_payments"), &InstanceId::new("i-1")).await.unwrap();
        assert!(open.is_none());
    }

    #[tokio::test]
    async fn repeated_identical_heartbeat_within_window_is_deduped() {
        let (store, csot, bus, _cache, svc) = harness().await;
        seed_service(&store).await;
        csot.set("svc_payments", "dev", "aaaa");

        svc.ingest(payload("bbbb")).await.unwrap();
        svc.ingest(payload("bbbb")).await.unwrap();
        // a second identical heartbeat must not open a second refresh
        assert_eq!(bus.messages().len(), 1);
    }

    #[tokio::test]
    async fn missing_expected_hash_yields_unknown_status() {
        let (store, _csot, _bus, _cache, svc) = harness().await;
        seed_service(&store).await;
        // no hash registered with the fake CSoT
        let result = svc.ingest(payload("aaaa")).await.unwrap();
        assert_eq!(result.outcome, IngestOutcome::Unknown);
        assert!(!result.drift_detected);
    }

    #[tokio::test]
    async fn csot_outage_falls_back_to_cached_expected_hash() {
        let (store, csot, _bus, cache, svc) = harness().await;
        seed_service(&store).await;
        csot.set("svc_payments", "dev", "aaaa");
        svc.ingest(payload("aaaa")).await.unwrap();

        // evict the primary expected-hash tier but leave csot-fallback intact,
        // then take the CSoT down — the lookup must still resolve via fallback
        cache.expected_hash.invalidate(&expected_hash_key("svc_payments", "dev")).await;
        csot.set_failing(true);

        let result = svc.ingest(payload("aaaa")).await.unwrap();
        assert_eq!(result.outcome, IngestOutcome::Healthy);
        assert_eq!(svc.csot_fallback_used_count(), 1);
    }

    #[tokio::test]
    async fn auto_register_creates_the_service_on_first_heartbeat() {
        let store = Arc::new(InMemoryStore::new());
        let csot = Arc::new(FakeCsot::new());
        let bus = Arc::new(RecordingBus::new());
        let cache = Arc::new(CacheRegistry::new(CacheTtls::default(), None));
        let cfg = HeartbeatServiceConfig { auto_register_on_first_heartbeat: true, prod_environment_names: vec!["prod".to_string()] };
        let svc = HeartbeatService::new(store.clone(), store.clone(), store.clone(), cache, csot, bus, CircuitBreaker::new(5, Duration::from_secs(30)), Duration::from_secs(5), cfg);

        let result = svc.ingest(payload("aaaa")).await.unwrap();
        assert_eq!(result.outcome, IngestOutcome::Unknown);
        assert!(store.get(&ServiceId::new("svc_payments")).await.unwrap().is_some());
    }
}
