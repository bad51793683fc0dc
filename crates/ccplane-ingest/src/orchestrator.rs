use std::sync::Arc;

use ccplane_domain::ControlPlaneError;
use ccplane_resilience::{Bulkhead, Deadline};
use ccplane_store::{ApplicationServiceRepository, DriftEventRepository, ServiceInstanceRepository};

use crate::error::IngestError;
use crate::heartbeat::{HeartbeatPayload, HeartbeatService, IngestResult};
use crate::lock::InstanceLocks;

/// Composes the pieces spec.md §5 asks of every heartbeat call: a deadline
/// check at the top, a concurrency gate (`Bulkhead`), and per-instance
/// ordering (`InstanceLocks`) around the actual classification work in
/// `HeartbeatService`. Grounded on the teacher's pattern of a thin
/// orchestration layer wrapping the domain service with cross-cutting
/// concerns, rather than folding them into the service itself.
pub struct IngestOrchestrator<Services, Instances, Drifts> {
    heartbeats: Arc<HeartbeatService<Services, Instances, Drifts>>,
    locks: InstanceLocks,
    bulkhead: Bulkhead,
}

impl<Services, Instances, Drifts> IngestOrchestrator<Services, Instances, Drifts>
where
    Services: ApplicationServiceRepository,
    Instances: ServiceInstanceRepository,
    Drifts: DriftEventRepository,
{
    pub fn new(heartbeats: Arc<HeartbeatService<Services, Instances, Drifts>>, concurrency: usize, lock_shards: usize) -> Self {
        Self { heartbeats, locks: InstanceLocks::new(lock_shards), bulkhead: Bulkhead::new(concurrency) }
    }

    pub async fn ingest(&self, payload: HeartbeatPayload, deadline: Deadline) -> Result<IngestResult, IngestError> {
        deadline.check()?;

        let heartbeats = self.heartbeats.clone();
        let locks = self.locks.clone();
        let instance_id = payload.instance_id.clone();

        let result: Result<IngestResult, ControlPlaneError> = self
            .bulkhead
            .call(move || async move {
                let _guard = locks.acquire(&instance_id).await;
                deadline.check()?;
                heartbeats.ingest(payload).await.map_err(ControlPlaneError::from)
            })
            .await;

        result.map_err(IngestError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heartbeat::HeartbeatServiceConfig;
    use crate::ports::fakes::{FakeCsot, RecordingBus};
    use ccplane_cache::{CacheRegistry, CacheTtls};
    use ccplane_domain::{Actor, ApplicationService, ServiceId};
    use ccplane_resilience::CircuitBreaker;
    use ccplane_store::InMemoryStore;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::time::Duration;

    fn payload(instance_id: &str, hash: &str) -> HeartbeatPayload {
        HeartbeatPayload {
            service_name: "svc_payments".to_string(),
            instance_id: instance_id.to_string(),
            config_hash: hash.to_string(),
            host: None,
            port: None,
            environment: "dev".to_string(),
            version: None,
            metadata: HashMap::new(),
        }
    }

    async fn orchestrator() -> (Arc<InMemoryStore>, IngestOrchestrator<InMemoryStore, InMemoryStore, InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let svc = ApplicationService::new(ServiceId::new("svc_payments"), "payments", vec!["dev".to_string()], Actor::system(), Utc::now());
        store.upsert(&svc).await.unwrap();

        let csot = Arc::new(FakeCsot::new());
        csot.set("svc_payments", "dev", "aaaa");
        let bus = Arc::new(RecordingBus::new());
        let cache = Arc::new(CacheRegistry::new(CacheTtls::default(), None));
        let config = HeartbeatServiceConfig { auto_register_on_first_heartbeat: false, prod_environment_names: vec![] };

        let heartbeats = Arc::new(HeartbeatService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            cache,
            csot,
            bus,
            CircuitBreaker::new(5, Duration::from_secs(30)),
            Duration::from_secs(5),
            config,
        ));

        (store.clone(), IngestOrchestrator::new(heartbeats, 4, 8))
    }

    #[tokio::test]
    async fn accepts_a_heartbeat_within_its_deadline() {
        let (_store, orch) = orchestrator().await;
        let result = orch.ingest(payload("i-1", "aaaa"), Deadline::after(Duration::from_secs(1))).await.unwrap();
        assert!(!result.drift_detected);
    }

    #[tokio::test]
    async fn expired_deadline_is_rejected_before_any_work() {
        let (_store, orch) = orchestrator().await;
        tokio::time::sleep(Duration::from_millis(2)).await;
        let err = orch.ingest(payload("i-1", "aaaa"), Deadline::after(Duration::from_millis(0))).await.unwrap_err();
        assert!(matches!(err, IngestError::DeadlineExceeded));
    }

    #[tokio::test]
    async fn saturated_bulkhead_rejects_with_backpressure() {
        let store = Arc::new(InMemoryStore::new());
        let svc = ApplicationService::new(ServiceId::new("svc_payments"), "payments", vec!["dev".to_string()], Actor::system(), Utc::now());
        store.upsert(&svc).await.unwrap();
        let csot = Arc::new(FakeCsot::new());
        csot.set("svc_payments", "dev", "aaaa");
        let bus = Arc::new(RecordingBus::new());
        let cache = Arc::new(CacheRegistry::new(CacheTtls::default(), None));
        let config = HeartbeatServiceConfig { auto_register_on_first_heartbeat: false, prod_environment_names: vec![] };
        let heartbeats = Arc::new(HeartbeatService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            cache,
            csot,
            bus,
            CircuitBreaker::new(5, Duration::from_secs(30)),
            Duration::from_secs(5),
            config,
        ));
        let orch = Arc::new(IngestOrchestrator::new(heartbeats, 0, 8));

        let err = orch.ingest(payload("i-1", "aaaa"), Deadline::after(Duration::from_secs(1))).await.unwrap_err();
        assert!(matches!(err, IngestError::Backpressure));
    }
}
