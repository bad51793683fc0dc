use async_trait::async_trait;
use ccplane_domain::{
    ApplicationService, ApprovalDecision, ApprovalRequest, Criteria, DriftEvent, IamTeam, IamUser,
    InstanceId, ServiceId, ServiceInstance, ServiceShare, TeamId, UserId,
};
use uuid::Uuid;

use crate::error::StoreError;

#[async_trait]
pub trait ApplicationServiceRepository: Send + Sync + 'static {
    async fn get(&self, id: &ServiceId) -> Result<Option<ApplicationService>, StoreError>;
    async fn get_by_display_name(&self, display_name: &str) -> Result<Option<ApplicationService>, StoreError>;
    async fn upsert(&self, service: &ApplicationService) -> Result<(), StoreError>;
    async fn delete(&self, id: &ServiceId) -> Result<(), StoreError>;
    async fn list(&self, criteria: &Criteria) -> Result<Vec<ApplicationService>, StoreError>;
}

#[async_trait]
pub trait ServiceInstanceRepository: Send + Sync + 'static {
    async fn get(&self, service_id: &ServiceId, instance_id: &InstanceId) -> Result<Option<ServiceInstance>, StoreError>;
    async fn upsert(&self, instance: &ServiceInstance) -> Result<(), StoreError>;
    async fn delete(&self, service_id: &ServiceId, instance_id: &InstanceId) -> Result<(), StoreError>;
    async fn list_for_service(&self, service_id: &ServiceId) -> Result<Vec<ServiceInstance>, StoreError>;

    /// Every instance not seen since `cutoff` — the reaper's stale/delete scans
    /// drive off schedule, not storage TTL, so this is a plain query.
    async fn list_stale(&self, cutoff: chrono::DateTime<chrono::Utc>) -> Result<Vec<ServiceInstance>, StoreError>;
}

#[async_trait]
pub trait DriftEventRepository: Send + Sync + 'static {
    async fn get(&self, id: Uuid) -> Result<Option<DriftEvent>, StoreError>;

    /// The open (non-terminal) drift event for an instance, if any — backs
    /// the `(serviceId, instanceId, status)` lookup spec.md §6 requires.
    async fn find_open(&self, service_id: &ServiceId, instance_id: &InstanceId) -> Result<Option<DriftEvent>, StoreError>;
    async fn upsert(&self, event: &DriftEvent) -> Result<(), StoreError>;
    async fn list_for_service(&self, service_id: &ServiceId) -> Result<Vec<DriftEvent>, StoreError>;
    async fn list_open(&self) -> Result<Vec<DriftEvent>, StoreError>;
    async fn list_all(&self) -> Result<Vec<DriftEvent>, StoreError>;
}

#[async_trait]
pub trait ServiceShareRepository: Send + Sync + 'static {
    async fn get(&self, id: Uuid) -> Result<Option<ServiceShare>, StoreError>;
    async fn upsert(&self, share: &ServiceShare) -> Result<(), StoreError>;
    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;
    async fn list_for_service(&self, service_id: &ServiceId) -> Result<Vec<ServiceShare>, StoreError>;
    async fn list_for_grantee(&self, grantee_type: ccplane_domain::GranteeType, grantee_id: &str) -> Result<Vec<ServiceShare>, StoreError>;
    async fn list_all(&self) -> Result<Vec<ServiceShare>, StoreError>;
}

#[async_trait]
pub trait ApprovalRepository: Send + Sync + 'static {
    async fn get(&self, id: Uuid) -> Result<Option<ApprovalRequest>, StoreError>;

    /// Compare-and-swap on `expected_version` — the version must equal the
    /// stored request's `version` or this returns `VersionConflict`
    /// (spec.md §5's optimistic-CAS shared-resource policy).
    async fn cas_update(&self, request: &ApprovalRequest, expected_version: u64) -> Result<(), StoreError>;
    async fn insert(&self, request: &ApprovalRequest) -> Result<(), StoreError>;
    async fn append_decision(&self, decision: &ApprovalDecision) -> Result<(), StoreError>;
    async fn list_decisions(&self, request_id: Uuid) -> Result<Vec<ApprovalDecision>, StoreError>;
    async fn list_pending_for_target_team(&self, team_id: &TeamId) -> Result<Vec<ApprovalRequest>, StoreError>;
}

#[async_trait]
pub trait IamRepository: Send + Sync + 'static {
    async fn get_user(&self, id: &UserId) -> Result<Option<IamUser>, StoreError>;
    async fn upsert_user(&self, user: &IamUser) -> Result<(), StoreError>;
    async fn get_team(&self, id: &TeamId) -> Result<Option<IamTeam>, StoreError>;
    async fn upsert_team(&self, team: &IamTeam) -> Result<(), StoreError>;
    async fn list_users_in_team(&self, team_id: &TeamId) -> Result<Vec<IamUser>, StoreError>;
}
