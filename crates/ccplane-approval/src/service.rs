use std::collections::HashMap;
use std::sync::Arc;

use ccplane_access::PermissionCacheInvalidator;
use ccplane_domain::{
    Actor, ApprovalDecision, ApprovalRequest, ApprovalStatus, DecisionValue, Gate,
    GateRequirement, RequesterSnapshot, Role, ServiceId, TeamId, UserId,
};
use ccplane_resilience::retry_on_conflict;
use ccplane_store::{ApplicationServiceRepository, ApprovalRepository, IamRepository, StoreError};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::error::ApprovalError;

/// Tunables the workflow needs from configuration, passed in rather than
/// depending on `ccplane-config` directly so this crate stays a leaf.
#[derive(Debug, Clone)]
pub struct ApprovalServiceConfig {
    pub max_cas_retries: u32,
    pub default_gates: Vec<GateRequirement>,
}

impl Default for ApprovalServiceConfig {
    fn default() -> Self {
        Self {
            max_cas_retries: 5,
            default_gates: vec![
                GateRequirement { gate: Gate::sys_admin(), min_approvals: 1 },
                GateRequirement { gate: Gate::line_manager(), min_approvals: 1 },
            ],
        }
    }
}

/// Multi-gate approval workflow for service-ownership transfers
/// (spec.md §4.4).
pub struct ApprovalService<Approvals, Services, Iam, Invalidator> {
    approvals: Arc<Approvals>,
    services: Arc<Services>,
    iam: Arc<Iam>,
    invalidator: Arc<Invalidator>,
    config: ApprovalServiceConfig,
}

impl<Approvals, Services, Iam, Invalidator> ApprovalService<Approvals, Services, Iam, Invalidator>
where
    Approvals: ApprovalRepository,
    Services: ApplicationServiceRepository,
    Iam: IamRepository,
    Invalidator: PermissionCacheInvalidator,
{
    pub fn new(
        approvals: Arc<Approvals>,
        services: Arc<Services>,
        iam: Arc<Iam>,
        invalidator: Arc<Invalidator>,
        config: ApprovalServiceConfig,
    ) -> Self {
        Self { approvals, services, iam, invalidator, config }
    }

    pub async fn create_request(
        &self,
        requester_user_id: UserId,
        requester_snapshot: RequesterSnapshot,
        target_service_id: ServiceId,
        target_team_id: TeamId,
        gates: Option<Vec<GateRequirement>>,
    ) -> Result<ApprovalRequest, ApprovalError> {
        let service = self
            .services
            .get(&target_service_id)
            .await?
            .ok_or_else(|| ApprovalError::ServiceRetired(target_service_id.to_string()))?;
        if service.is_retired() {
            return Err(ApprovalError::ServiceRetired(target_service_id.to_string()));
        }

        let eligible = requester_snapshot.roles.contains(&Role::SysAdmin)
            || requester_snapshot.team_ids.contains(&target_team_id);
        if !eligible {
            return Err(ApprovalError::RequesterNotEligible);
        }

        let required = gates.unwrap_or_else(|| self.config.default_gates.clone());
        let request = ApprovalRequest::new(
            requester_user_id,
            target_service_id,
            target_team_id,
            required,
            requester_snapshot,
            Utc::now(),
        );
        self.approvals.insert(&request).await?;
        info!(request_id = %request.id, "approval request created");
        Ok(request)
    }

    /// Record one gate decision and, if it completes the quorum (or
    /// short-circuits on reject), transition the request. The decision row
    /// is appended exactly once — outside the retry loop — so a retry
    /// never re-attempts the append and never mistakes an unrelated CAS
    /// conflict for a duplicate decision (spec.md §4.4 "Concurrency").
    pub async fn decide(
        &self,
        request_id: Uuid,
        approver_user_id: UserId,
        gate: Gate,
        decision: DecisionValue,
    ) -> Result<ApprovalRequest, ApprovalError> {
        let request = self
            .approvals
            .get(request_id)
            .await?
            .ok_or(ApprovalError::NotFound(request_id))?;

        if request.status.is_terminal() {
            return Err(ApprovalError::AlreadyTerminal(request_id));
        }
        if !self.approver_authorized(&request, &approver_user_id, &gate).await {
            return Err(ApprovalError::UnauthorizedGate(format!(
                "{approver_user_id} is not authorized for gate {gate}"
            )));
        }

        let decision_record = ApprovalDecision {
            request_id,
            approver_user_id: approver_user_id.clone(),
            gate: gate.clone(),
            decision,
            at: Utc::now(),
        };
        self.approvals.append_decision(&decision_record).await.map_err(|e| match e {
            StoreError::AlreadyExists(_) => {
                ApprovalError::DuplicateDecision { request_id, gate: gate.to_string() }
            }
            other => ApprovalError::Store(other),
        })?;

        let result = retry_on_conflict(self.config.max_cas_retries, || self.recompute_and_commit(request_id)).await;

        result.map_err(|e| match e.kind {
            ccplane_domain::ErrorKind::Conflict => ApprovalError::Conflict(request_id),
            ccplane_domain::ErrorKind::AlreadyTerminal => ApprovalError::AlreadyTerminal(request_id),
            ccplane_domain::ErrorKind::NotFound => ApprovalError::NotFound(request_id),
            _ => ApprovalError::Store(StoreError::Internal(e.message)),
        })
    }

    /// Re-read the request, recompute every gate's tally from the full
    /// persisted decision list (never a locally-incremented counter), and
    /// CAS the transition. Deriving `counts`/`status` fresh from
    /// `list_decisions` on every attempt — instead of mutating an
    /// in-memory running tally — is what makes this safe to re-enter on a
    /// version conflict: a retry observes every decision recorded so far,
    /// including ones committed by other gates since the last attempt, and
    /// never re-appends anything itself.
    async fn recompute_and_commit(&self, request_id: Uuid) -> Result<ApprovalRequest, ccplane_domain::ControlPlaneError> {
        let mut request = self
            .approvals
            .get(request_id)
            .await
            .map_err(store_err)?
            .ok_or_else(|| ccplane_domain::ControlPlaneError::not_found(request_id.to_string()))?;

        if request.status.is_terminal() {
            // A concurrent decision already resolved this request (e.g. a
            // REJECT on another gate). Our own decision above is persisted
            // regardless — the request is terminal either way (spec.md §8).
            return Ok(request);
        }

        let decisions = self.approvals.list_decisions(request_id).await.map_err(store_err)?;
        let mut counts: HashMap<Gate, u32> = HashMap::new();
        let mut rejected = false;
        for d in &decisions {
            match d.decision {
                DecisionValue::Approve => *counts.entry(d.gate.clone()).or_insert(0) += 1,
                DecisionValue::Reject => rejected = true,
            }
        }
        request.counts = counts;

        let old_owner = self
            .services
            .get(&request.target_service_id)
            .await
            .map_err(store_err)?
            .and_then(|s| s.owner_team_id);

        let expected_version = request.version;
        request.status = if rejected {
            ApprovalStatus::Rejected
        } else if request.quorum_met() {
            ApprovalStatus::Approved
        } else {
            ApprovalStatus::Pending
        };
        request.version += 1;
        request.updated_at = Utc::now();

        self.approvals.cas_update(&request, expected_version).await.map_err(|e| match e {
            StoreError::VersionConflict(_) => ccplane_domain::ControlPlaneError::conflict(request_id.to_string()),
            other => store_err(other),
        })?;

        if request.status == ApprovalStatus::Approved {
            self.apply_ownership_transfer(&mut request, old_owner).await.map_err(store_err)?;
        }

        Ok(request)
    }

    /// Update `ApplicationService.ownerTeamId` and invalidate the
    /// permission cache for every user whose team set intersects the old
    /// or new owner. Not rolled back on failure — `ownership_side_effect_applied`
    /// tracks completion so a compensating retry can finish the job later
    /// (spec.md §9, Open Question 3).
    async fn apply_ownership_transfer(&self, request: &mut ApprovalRequest, old_owner: Option<TeamId>) -> Result<(), StoreError> {
        if request.ownership_side_effect_applied {
            return Ok(());
        }
        if let Some(mut service) = self.services.get(&request.target_service_id).await? {
            service.owner_team_id = Some(request.target_team_id.clone());
            service.updated_at = Utc::now();
            service.updated_by = Actor::system();
            self.services.upsert(&service).await?;
        }

        let mut affected_users = Vec::new();
        if let Some(old) = &old_owner {
            affected_users.extend(self.iam.list_users_in_team(old).await?);
        }
        affected_users.extend(self.iam.list_users_in_team(&request.target_team_id).await?);
        for user in affected_users {
            self.invalidator.invalidate(user.user_id.as_str(), request.target_service_id.as_str()).await;
        }

        request.ownership_side_effect_applied = true;
        // Best-effort: the caller already committed the APPROVED transition
        // above; if this second write loses a race, a compensating job
        // re-applies the whole side effect next pass (idempotent).
        let _ = self.approvals.cas_update(request, request.version).await;
        Ok(())
    }

    pub async fn cancel(&self, request_id: Uuid, actor_user_id: &UserId, actor_roles: &[Role]) -> Result<ApprovalRequest, ApprovalError> {
        let result = retry_on_conflict(self.config.max_cas_retries, || async {
            let mut request = self
                .approvals
                .get(request_id)
                .await
                .map_err(store_err)?
                .ok_or_else(|| ccplane_domain::ControlPlaneError::not_found(request_id.to_string()))?;
            if request.status.is_terminal() {
                return Err(ccplane_domain::ControlPlaneError::already_terminal(request_id.to_string()));
            }
            let allowed = &request.requester_user_id == actor_user_id || actor_roles.contains(&Role::SysAdmin);
            if !allowed {
                return Err(ccplane_domain::ControlPlaneError::unauthorized("only the requester or SYS_ADMIN may cancel"));
            }
            let expected_version = request.version;
            request.status = ApprovalStatus::Cancelled;
            request.version += 1;
            request.updated_at = Utc::now();
            self.approvals.cas_update(&request, expected_version).await.map_err(|e| match e {
                StoreError::VersionConflict(_) => ccplane_domain::ControlPlaneError::conflict(request_id.to_string()),
                other => store_err(other),
            })?;
            Ok(request)
        })
        .await;

        result.map_err(|e| match e.kind {
            ccplane_domain::ErrorKind::Conflict => ApprovalError::Conflict(request_id),
            ccplane_domain::ErrorKind::AlreadyTerminal => ApprovalError::AlreadyTerminal(request_id),
            ccplane_domain::ErrorKind::Unauthorized => ApprovalError::UnauthorizedCancel,
            _ => ApprovalError::Store(StoreError::Internal(e.message)),
        })
    }

    /// `SYS_ADMIN` requires the approver's *current* roles (a live IAM
    /// lookup, not the requester's snapshot); `LINE_MANAGER` requires the
    /// approver match the snapshot taken at request-creation time, so a
    /// later manager change doesn't retroactively authorize someone
    /// (spec.md §4.4).
    async fn approver_authorized(&self, request: &ApprovalRequest, approver_user_id: &UserId, gate: &Gate) -> bool {
        if gate.0 == Gate::SYS_ADMIN {
            return match self.iam.get_user(approver_user_id).await {
                Ok(Some(user)) => user.is_sys_admin(),
                _ => false,
            };
        }
        if gate.0 == Gate::LINE_MANAGER {
            return request.snapshot.manager_id.as_ref() == Some(approver_user_id);
        }
        false
    }
}

fn store_err(e: StoreError) -> ccplane_domain::ControlPlaneError {
    match e {
        StoreError::NotFound(m) => ccplane_domain::ControlPlaneError::not_found(m),
        StoreError::AlreadyExists(m) => ccplane_domain::ControlPlaneError::conflict(m),
        StoreError::VersionConflict(m) => ccplane_domain::ControlPlaneError::conflict(m),
        StoreError::Serialization(e) => ccplane_domain::ControlPlaneError::internal(e.to_string()),
        StoreError::Internal(m) => ccplane_domain::ControlPlaneError::internal(m),
    }
}
