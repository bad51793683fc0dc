use std::sync::Arc;
use std::time::Duration;

use ccplane_domain::Actor;
use ccplane_store::{DriftEventRepository, ServiceInstanceRepository, StoreError};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

/// What one sweep did, for the counters spec.md §4.2 asks for
/// (`stale_instances_marked`, `stale_instances_deleted`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepCounters {
    pub marked_unhealthy: u64,
    pub deleted: u64,
}

/// Pure scan-and-act logic, independent of scheduling (spec.md §4.2). Kept
/// as its own unit so a single sweep can be exercised in tests without
/// standing up a ticker.
pub struct StaleInstanceReaper<Instances, Drifts> {
    instances: Arc<Instances>,
    drifts: Arc<Drifts>,
    stale_threshold: Duration,
    delete_threshold: Duration,
}

impl<Instances, Drifts> StaleInstanceReaper<Instances, Drifts>
where
    Instances: ServiceInstanceRepository,
    Drifts: DriftEventRepository,
{
    pub fn new(instances: Arc<Instances>, drifts: Arc<Drifts>, stale_threshold: Duration, delete_threshold: Duration) -> Self {
        Self { instances, drifts, stale_threshold, delete_threshold }
    }

    /// Scan every instance at least `stale_threshold` old and either mark it
    /// `UNHEALTHY` (age < `delete_threshold`) or delete it and force-close its
    /// open drift event (age ≥ `delete_threshold`).
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> Result<SweepCounters, StoreError> {
        let stale_cutoff = now - chrono::Duration::from_std(self.stale_threshold).unwrap_or(chrono::Duration::zero());
        let candidates = self.instances.list_stale(stale_cutoff).await?;

        let mut counters = SweepCounters::default();
        for instance in candidates {
            let age = instance.age(now);
            let delete_threshold = chrono::Duration::from_std(self.delete_threshold).unwrap_or(chrono::Duration::zero());

            if age >= delete_threshold {
                if let Some(mut open) = self.drifts.find_open(&instance.service_id, &instance.instance_id).await? {
                    open.resolve(Actor::system_reap(), now);
                    self.drifts.upsert(&open).await?;
                }
                self.instances.delete(&instance.service_id, &instance.instance_id).await?;
                debug!(service_id = %instance.service_id, instance_id = %instance.instance_id, "deleted stale instance");
                counters.deleted += 1;
            } else if instance.status != ccplane_domain::InstanceStatus::Unhealthy {
                let mut updated = instance;
                updated.status = ccplane_domain::InstanceStatus::Unhealthy;
                updated.updated_at = now;
                self.instances.upsert(&updated).await?;
                debug!(service_id = %updated.service_id, instance_id = %updated.instance_id, "marked instance unhealthy");
                counters.marked_unhealthy += 1;
            }
        }

        if counters.marked_unhealthy > 0 || counters.deleted > 0 {
            info!(marked = counters.marked_unhealthy, deleted = counters.deleted, "reaper sweep complete");
        }
        Ok(counters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccplane_domain::{DriftEvent, DriftSeverity, InstanceId, InstanceStatus, ServiceId, ServiceInstance};
    use ccplane_store::InMemoryStore;

    fn reaper(store: Arc<InMemoryStore>) -> StaleInstanceReaper<InMemoryStore, InMemoryStore> {
        StaleInstanceReaper::new(store.clone(), store, Duration::from_secs(60), Duration::from_secs(3600))
    }

    #[tokio::test]
    async fn fresh_instance_is_untouched() {
        let store = Arc::new(InMemoryStore::new());
        let now = Utc::now();
        let instance = ServiceInstance::new(ServiceId::new("svc_a"), InstanceId::new("i-1"), "prod", now);
        store.upsert(&instance).await.unwrap();

        let counters = reaper(store.clone()).sweep_once(now).await.unwrap();
        assert_eq!(counters, SweepCounters::default());
        let stored = store.get(&ServiceId::new("svc_a"), &InstanceId::new("i-1")).await.unwrap().unwrap();
        assert_eq!(stored.status, InstanceStatus::Healthy);
    }

    #[tokio::test]
    async fn instance_past_stale_threshold_is_marked_unhealthy() {
        let store = Arc::new(InMemoryStore::new());
        let last_seen = Utc::now() - chrono::Duration::seconds(90);
        let mut instance = ServiceInstance::new(ServiceId::new("svc_a"), InstanceId::new("i-1"), "prod", last_seen);
        instance.last_seen_at = last_seen;
        store.upsert(&instance).await.unwrap();

        let counters = reaper(store.clone()).sweep_once(Utc::now()).await.unwrap();
        assert_eq!(counters.marked_unhealthy, 1);
        assert_eq!(counters.deleted, 0);

        let stored = store.get(&ServiceId::new("svc_a"), &InstanceId::new("i-1")).await.unwrap().unwrap();
        assert_eq!(stored.status, InstanceStatus::Unhealthy);
    }

    #[tokio::test]
    async fn instance_past_delete_threshold_is_removed_and_drift_resolved() {
        let store = Arc::new(InMemoryStore::new());
        let last_seen = Utc::now() - chrono::Duration::seconds(4000);
        let mut instance = ServiceInstance::new(ServiceId::new("svc_a"), InstanceId::new("i-1"), "prod", last_seen);
        instance.last_seen_at = last_seen;
        store.upsert(&instance).await.unwrap();

        let open = DriftEvent::open(
            ServiceId::new("svc_a"),
            InstanceId::new("i-1"),
            None,
            "aaaa".to_string(),
            "bbbb".to_string(),
            DriftSeverity::Medium,
            Actor::system(),
            last_seen,
        );
        store.upsert(&open).await.unwrap();

        let counters = reaper(store.clone()).sweep_once(Utc::now()).await.unwrap();
        assert_eq!(counters.deleted, 1);
        assert_eq!(counters.marked_unhealthy, 0);

        assert!(store.get(&ServiceId::new("svc_a"), &InstanceId::new("i-1")).await.unwrap().is_none());
        let stored_drift = store.get(open.id).await.unwrap().unwrap();
        assert!(!stored_drift.is_open());
        assert_eq!(stored_drift.resolved_by, Some(Actor::system_reap()));
    }

    #[tokio::test]
    async fn already_unhealthy_instance_is_not_recounted() {
        let store = Arc::new(InMemoryStore::new());
        let last_seen = Utc::now() - chrono::Duration::seconds(90);
        let mut instance = ServiceInstance::new(ServiceId::new("svc_a"), InstanceId::new("i-1"), "prod", last_seen);
        instance.last_seen_at = last_seen;
        instance.status = InstanceStatus::Unhealthy;
        store.upsert(&instance).await.unwrap();

        let counters = reaper(store).sweep_once(Utc::now()).await.unwrap();
        assert_eq!(counters.marked_unhealthy, 0);
    }
}
