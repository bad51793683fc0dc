use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use ccplane_domain::{
    ApplicationService, ApprovalDecision, ApprovalRequest, Criteria, DriftEvent, GranteeType,
    IamTeam, IamUser, InstanceId, InstanceKey, ServiceId, ServiceInstance, ServiceShare, TeamId,
    UserId,
};
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::StoreError;
use crate::ports::{
    ApplicationServiceRepository, ApprovalRepository, DriftEventRepository, IamRepository,
    ServiceInstanceRepository, ServiceShareRepository,
};

#[derive(Debug, Default)]
struct Inner {
    services: HashMap<ServiceId, ApplicationService>,
    instances: HashMap<InstanceKey, ServiceInstance>,
    drift_events: HashMap<Uuid, DriftEvent>,
    shares: HashMap<Uuid, ServiceShare>,
    approvals: HashMap<Uuid, ApprovalRequest>,
    decisions: Vec<ApprovalDecision>,
    iam_users: HashMap<UserId, IamUser>,
    iam_teams: HashMap<TeamId, IamTeam>,
}

/// In-memory implementation of every repository port, grounded on the
/// teacher's `Arc<RwLock<HashMap>>` store. All data is lost on process
/// exit — suitable for tests and for running the plane without a database.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ApplicationServiceRepository for InMemoryStore {
    async fn get(&self, id: &ServiceId) -> Result<Option<ApplicationService>, StoreError> {
        Ok(self.inner.read().await.services.get(id).cloned())
    }

    async fn get_by_display_name(&self, display_name: &str) -> Result<Option<ApplicationService>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .services
            .values()
            .find(|s| s.display_name == display_name)
            .cloned())
    }

    async fn upsert(&self, service: &ApplicationService) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        if let Some(existing) = guard.services.values().find(|s| {
            s.display_name == service.display_name && s.id != service.id
        }) {
            return Err(StoreError::AlreadyExists(format!(
                "display name {} already used by {}",
                service.display_name, existing.id
            )));
        }
        guard.services.insert(service.id.clone(), service.clone());
        Ok(())
    }

    async fn delete(&self, id: &ServiceId) -> Result<(), StoreError> {
        self.inner.write().await.services.remove(id);
        Ok(())
    }

    async fn list(&self, criteria: &Criteria) -> Result<Vec<ApplicationService>, StoreError> {
        let guard = self.inner.read().await;
        Ok(guard
            .services
            .values()
            .filter(|s| criteria.matches_service(&s.id, s.owner_team_id.as_ref()))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ServiceInstanceRepository for InMemoryStore {
    async fn get(&self, service_id: &ServiceId, instance_id: &InstanceId) -> Result<Option<ServiceInstance>, StoreError> {
        let key = InstanceKey { service_id: service_id.clone(), instance_id: instance_id.clone() };
        Ok(self.inner.read().await.instances.get(&key).cloned())
    }

    async fn upsert(&self, instance: &ServiceInstance) -> Result<(), StoreError> {
        let key = InstanceKey {
            service_id: instance.service_id.clone(),
            instance_id: instance.instance_id.clone(),
        };
        self.inner.write().await.instances.insert(key, instance.clone());
        Ok(())
    }

    async fn delete(&self, service_id: &ServiceId, instance_id: &InstanceId) -> Result<(), StoreError> {
        let key = InstanceKey { service_id: service_id.clone(), instance_id: instance_id.clone() };
        self.inner.write().await.instances.remove(&key);
        Ok(())
    }

    async fn list_for_service(&self, service_id: &ServiceId) -> Result<Vec<ServiceInstance>, StoreError> {
        let guard = self.inner.read().await;
        Ok(guard.instances.values().filter(|i| &i.service_id == service_id).cloned().collect())
    }

    async fn list_stale(&self, cutoff: DateTime<Utc>) -> Result<Vec<ServiceInstance>, StoreError> {
        let guard = self.inner.read().await;
        Ok(guard.instances.values().filter(|i| i.last_seen_at < cutoff).cloned().collect())
    }
}

#[async_trait]
impl DriftEventRepository for InMemoryStore {
    async fn get(&self, id: Uuid) -> Result<Option<DriftEvent>, StoreError> {
        Ok(self.inner.read().await.drift_events.get(&id).cloned())
    }

    async fn find_open(&self, service_id: &ServiceId, instance_id: &InstanceId) -> Result<Option<DriftEvent>, StoreError> {
        let guard = self.inner.read().await;
        Ok(guard
            .drift_events
            .values()
            .find(|e| &e.service_id == service_id && &e.instance_id == instance_id && e.is_open())
            .cloned())
    }

    async fn upsert(&self, event: &DriftEvent) -> Result<(), StoreError> {
        self.inner.write().await.drift_events.insert(event.id, event.clone());
        Ok(())
    }

    async fn list_for_service(&self, service_id: &ServiceId) -> Result<Vec<DriftEvent>, StoreError> {
        let guard = self.inner.read().await;
        Ok(guard.drift_events.values().filter(|e| &e.service_id == service_id).cloned().collect())
    }

    async fn list_open(&self) -> Result<Vec<DriftEvent>, StoreError> {
        let guard = self.inner.read().await;
        Ok(guard.drift_events.values().filter(|e| e.is_open()).cloned().collect())
    }

    async fn list_all(&self) -> Result<Vec<DriftEvent>, StoreError> {
        Ok(self.inner.read().await.drift_events.values().cloned().collect())
    }
}

#[async_trait]
impl ServiceShareRepository for InMemoryStore {
    async fn get(&self, id: Uuid) -> Result<Option<ServiceShare>, StoreError> {
        Ok(self.inner.read().await.shares.get(&id).cloned())
    }

    async fn upsert(&self, share: &ServiceShare) -> Result<(), StoreError> {
        self.inner.write().await.shares.insert(share.id, share.clone());
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        self.inner.write().await.shares.remove(&id);
        Ok(())
    }

    async fn list_for_service(&self, service_id: &ServiceId) -> Result<Vec<ServiceShare>, StoreError> {
        let guard = self.inner.read().await;
        Ok(guard.shares.values().filter(|s| &s.service_id == service_id).cloned().collect())
    }

    async fn list_for_grantee(&self, grantee_type: GranteeType, grantee_id: &str) -> Result<Vec<ServiceShare>, StoreError> {
        let guard = self.inner.read().await;
        Ok(guard
            .shares
            .values()
            .filter(|s| s.grantee_type == grantee_type && s.grantee_id == grantee_id)
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<ServiceShare>, StoreError> {
        Ok(self.inner.read().await.shares.values().cloned().collect())
    }
}

#[async_trait]
impl ApprovalRepository for InMemoryStore {
    async fn get(&self, id: Uuid) -> Result<Option<ApprovalRequest>, StoreError> {
        Ok(self.inner.read().await.approvals.get(&id).cloned())
    }

    async fn cas_update(&self, request: &ApprovalRequest, expected_version: u64) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        let current = guard
            .approvals
            .get(&request.id)
            .ok_or_else(|| StoreError::NotFound(request.id.to_string()))?;
        if current.version != expected_version {
            return Err(StoreError::VersionConflict(request.id.to_string()));
        }
        guard.approvals.insert(request.id, request.clone());
        Ok(())
    }

    async fn insert(&self, request: &ApprovalRequest) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        if guard.approvals.contains_key(&request.id) {
            return Err(StoreError::AlreadyExists(request.id.to_string()));
        }
        guard.approvals.insert(request.id, request.clone());
        Ok(())
    }

    async fn append_decision(&self, decision: &ApprovalDecision) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        if guard
            .decisions
            .iter()
            .any(|d| d.request_id == decision.request_id && d.approver_user_id == decision.approver_user_id && d.gate == decision.gate)
        {
            return Err(StoreError::AlreadyExists(format!(
                "duplicate decision for request {} gate {} by {}",
                decision.request_id, decision.gate, decision.approver_user_id
            )));
        }
        guard.decisions.push(decision.clone());
        Ok(())
    }

    async fn list_decisions(&self, request_id: Uuid) -> Result<Vec<ApprovalDecision>, StoreError> {
        let guard = self.inner.read().await;
        Ok(guard.decisions.iter().filter(|d| d.request_id == request_id).cloned().collect())
    }

    async fn list_pending_for_target_team(&self, team_id: &TeamId) -> Result<Vec<ApprovalRequest>, StoreError> {
        let guard = self.inner.read().await;
        Ok(guard
            .approvals
            .values()
            .filter(|r| &r.target_team_id == team_id && !r.status.is_terminal())
            .cloned()
            .collect())
    }
}

#[async_trait]
impl IamRepository for InMemoryStore {
    async fn get_user(&self, id: &UserId) -> Result<Option<IamUser>, StoreError> {
        Ok(self.inner.read().await.iam_users.get(id).cloned())
    }

    async fn upsert_user(&self, user: &IamUser) -> Result<(), StoreError> {
        self.inner.write().await.iam_users.insert(user.user_id.clone(), user.clone());
        Ok(())
    }

    async fn get_team(&self, id: &TeamId) -> Result<Option<IamTeam>, StoreError> {
        Ok(self.inner.read().await.iam_teams.get(id).cloned())
    }

    async fn upsert_team(&self, team: &IamTeam) -> Result<(), StoreError> {
        self.inner.write().await.iam_teams.insert(team.team_id.clone(), team.clone());
        Ok(())
    }

    async fn list_users_in_team(&self, team_id: &TeamId) -> Result<Vec<IamUser>, StoreError> {
        let guard = self.inner.read().await;
        Ok(guard.iam_users.values().filter(|u| u.team_ids.contains(team_id)).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccplane_domain::Actor;

    fn actor() -> Actor {
        Actor::system()
    }

    #[tokio::test]
    async fn upsert_then_get_round_trips_a_service() {
        let store = InMemoryStore::new();
        let service = ApplicationService::new(
            ServiceId::new("svc_a"),
            "payments".to_string(),
            vec!["prod".to_string()],
            actor(),
            Utc::now(),
        );
        store.upsert(&service).await.unwrap();
        let fetched = store.get(&service.id).await.unwrap().unwrap();
        assert_eq!(fetched.display_name, "payments");
    }

    #[tokio::test]
    async fn upsert_rejects_duplicate_display_name_for_a_different_id() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let a = ApplicationService::new(ServiceId::new("svc_a"), "payments".to_string(), vec!["prod".to_string()], actor(), now);
        let b = ApplicationService::new(ServiceId::new("svc_b"), "payments".to_string(), vec!["prod".to_string()], actor(), now);
        store.upsert(&a).await.unwrap();
        let err = store.upsert(&b).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn cas_update_rejects_stale_version() {
        let store = InMemoryStore::new();
        let req = ApprovalRequest::new(
            UserId::new("u1"),
            ServiceId::new("svc_a"),
            TeamId::new("team_core"),
            vec![],
            ccplane_domain::RequesterSnapshot { team_ids: vec![], manager_id: None, roles: vec![] },
            Utc::now(),
        );
        store.insert(&req).await.unwrap();
        let err = store.cas_update(&req, req.version + 1).await.unwrap_err();
        assert!(matches!(err, StoreError::VersionConflict(_)));
    }

    #[tokio::test]
    async fn append_decision_rejects_duplicate_gate_decision() {
        let store = InMemoryStore::new();
        let decision = ApprovalDecision {
            request_id: Uuid::new_v4(),
            approver_user_id: UserId::new("u9"),
            gate: ccplane_domain::Gate::line_manager(),
            decision: ccplane_domain::DecisionValue::Approve,
            at: Utc::now(),
        };
        store.append_decision(&decision).await.unwrap();
        let err = store.append_decision(&decision).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
    }
}
