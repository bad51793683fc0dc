use std::collections::HashSet;
use std::sync::Arc;

use ccplane_domain::DriftStatistics;
use ccplane_store::{DriftEventRepository, StoreError};

/// Read-side aggregate over drift events, backing `GET drift/statistics`
/// (spec.md §6). Kept separate from `HeartbeatService` — this is a pure
/// query path with no write concerns or locking requirements.
pub struct DriftService<D> {
    drifts: Arc<D>,
}

impl<D: DriftEventRepository> DriftService<D> {
    pub fn new(drifts: Arc<D>) -> Self {
        Self { drifts }
    }

    pub async fn statistics(&self) -> Result<DriftStatistics, StoreError> {
        let events = self.drifts.list_all().await?;

        let mut stats = DriftStatistics { total: events.len() as u64, ..Default::default() };
        let mut affected = HashSet::new();

        for event in &events {
            *stats.by_status.entry(status_label(event.status)).or_insert(0) += 1;
            *stats.by_severity.entry(severity_label(event.severity)).or_insert(0) += 1;
            if event.is_open() {
                stats.unresolved += 1;
                affected.insert((event.service_id.clone(), event.instance_id.clone()));
            }
        }
        stats.affected_instances = affected.len() as u64;

        Ok(stats)
    }
}

fn status_label(status: ccplane_domain::DriftStatus) -> String {
    use ccplane_domain::DriftStatus::*;
    match status {
        Detected => "DETECTED",
        Acknowledged => "ACKNOWLEDGED",
        Resolving => "RESOLVING",
        Resolved => "RESOLVED",
        Ignored => "IGNORED",
    }
    .to_string()
}

fn severity_label(severity: ccplane_domain::DriftSeverity) -> String {
    use ccplane_domain::DriftSeverity::*;
    match severity {
        Low => "LOW",
        Medium => "MED",
        High => "HIGH",
        Critical => "CRITICAL",
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccplane_domain::{Actor, DriftEvent, DriftSeverity, InstanceId, ServiceId};
    use ccplane_store::InMemoryStore;
    use chrono::Utc;

    #[tokio::test]
    async fn statistics_aggregate_across_status_and_severity() {
        let store = Arc::new(InMemoryStore::new());
        let now = Utc::now();

        let open_high = DriftEvent::open(
            ServiceId::new("svc_a"),
            InstanceId::new("i-1"),
            None,
            "aaaa".to_string(),
            "bbbb".to_string(),
            DriftSeverity::High,
            Actor::system(),
            now,
        );
        let mut resolved_low = DriftEvent::open(
            ServiceId::new("svc_a"),
            InstanceId::new("i-2"),
            None,
            "aaaa".to_string(),
            "cccc".to_string(),
            DriftSeverity::Low,
            Actor::system(),
            now,
        );
        resolved_low.resolve(Actor::system(), now);

        store.upsert(&open_high).await.unwrap();
        store.upsert(&resolved_low).await.unwrap();

        let service = DriftService::new(store);
        let stats = service.statistics().await.unwrap();

        assert_eq!(stats.total, 2);
        assert_eq!(stats.unresolved, 1);
        assert_eq!(stats.affected_instances, 1);
        assert_eq!(stats.by_status.get("DETECTED"), Some(&1));
        assert_eq!(stats.by_status.get("RESOLVED"), Some(&1));
        assert_eq!(stats.by_severity.get("HIGH"), Some(&1));
        assert_eq!(stats.by_severity.get("LOW"), Some(&1));
    }

    #[tokio::test]
    async fn multiple_open_events_for_the_same_instance_count_once() {
        let store = Arc::new(InMemoryStore::new());
        let now = Utc::now();
        let event = DriftEvent::open(
            ServiceId::new("svc_a"),
            InstanceId::new("i-1"),
            None,
            "aaaa".to_string(),
            "bbbb".to_string(),
            DriftSeverity::Medium,
            Actor::system(),
            now,
        );
        store.upsert(&event).await.unwrap();

        let service = DriftService::new(store);
        let stats = service.statistics().await.unwrap();
        assert_eq!(stats.affected_instances, 1);
    }
}
