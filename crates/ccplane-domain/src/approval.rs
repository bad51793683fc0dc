use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::ids::{ServiceId, TeamId, UserId};
use crate::types::{ApprovalRequestType, ApprovalStatus, DecisionValue, Gate, Role};

/// A single gate's quorum requirement, e.g. `{gate: SYS_ADMIN, min: 1}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateRequirement {
    pub gate: Gate,
    pub min_approvals: u32,
}

/// Snapshot of the requester's identity attributes at request-creation
/// time, used to authorize gate decisions deterministically even if the
/// requester's team/manager later changes in the IdP (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequesterSnapshot {
    pub team_ids: Vec<TeamId>,
    pub manager_id: Option<UserId>,
    pub roles: Vec<Role>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub id: Uuid,
    pub requester_user_id: UserId,
    pub request_type: ApprovalRequestType,
    pub target_service_id: ServiceId,
    pub target_team_id: TeamId,
    pub required: Vec<GateRequirement>,
    pub status: ApprovalStatus,
    /// Running tally of APPROVE decisions per gate. REJECT short-circuits
    /// the whole request rather than being tallied here.
    pub counts: HashMap<Gate, u32>,
    pub snapshot: RequesterSnapshot,
    /// Optimistic-lock version (spec.md §4.4); bumped on every transition.
    pub version: u64,
    /// Tracks whether the ownership-transfer side effect has been applied
    /// after an APPROVED transition (spec.md §4.4, Open Question 3). Not
    /// rolled back on failure — a compensating loop retries until true.
    pub ownership_side_effect_applied: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ApprovalRequest {
    pub fn new(
        requester_user_id: UserId,
        target_service_id: ServiceId,
        target_team_id: TeamId,
        required: Vec<GateRequirement>,
        snapshot: RequesterSnapshot,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            requester_user_id,
            request_type: ApprovalRequestType::AssignServiceToTeam,
            target_service_id,
            target_team_id,
            required,
            status: ApprovalStatus::Pending,
            counts: HashMap::new(),
            snapshot,
            version: 0,
            ownership_side_effect_applied: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// `true` once every required gate's APPROVE tally meets its quorum.
    /// Does not itself check for REJECT decisions — callers short-circuit
    /// to REJECTED the moment any REJECT is recorded, before this is ever
    /// consulted.
    pub fn quorum_met(&self) -> bool {
        self.required
            .iter()
            .all(|req| self.counts.get(&req.gate).copied().unwrap_or(0) >= req.min_approvals)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalDecision {
    pub request_id: Uuid,
    pub approver_user_id: UserId,
    pub gate: Gate,
    pub decision: DecisionValue,
    pub at: DateTime<Utc>,
}
