use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::actor::Actor;
use crate::ids::{InstanceId, ServiceId, TeamId};
use crate::types::{DriftSeverity, DriftStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftEvent {
    pub id: Uuid,
    pub service_id: ServiceId,
    pub instance_id: InstanceId,
    /// Snapshot of the owning team at detection time (spec.md §3) — not
    /// re-resolved if ownership later transfers, so historical drift
    /// events keep attributing to the team that owned the service then.
    pub team_id: Option<TeamId>,
    pub expected_hash: String,
    pub applied_hash: String,
    pub severity: DriftSeverity,
    pub status: DriftStatus,
    pub detected_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub detected_by: Actor,
    pub resolved_by: Option<Actor>,
    pub notes: Vec<String>,
}

impl DriftEvent {
    pub fn open(
        service_id: ServiceId,
        instance_id: InstanceId,
        team_id: Option<TeamId>,
        expected_hash: String,
        applied_hash: String,
        severity: DriftSeverity,
        detected_by: Actor,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            service_id,
            instance_id,
            team_id,
            expected_hash,
            applied_hash,
            severity,
            status: DriftStatus::Detected,
            detected_at: now,
            resolved_at: None,
            detected_by,
            resolved_by: None,
            notes: Vec::new(),
        }
    }

    pub fn resolve(&mut self, by: Actor, now: DateTime<Utc>) {
        self.status = DriftStatus::Resolved;
        self.resolved_at = Some(now);
        self.resolved_by = Some(by);
    }

    pub fn is_open(&self) -> bool {
        !self.status.is_terminal()
    }
}

/// Aggregate counters backing `GET drift/statistics` (spec.md §6).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DriftStatistics {
    pub total: u64,
    pub unresolved: u64,
    pub by_status: std::collections::HashMap<String, u64>,
    pub by_severity: std::collections::HashMap<String, u64>,
    pub affected_instances: u64,
}
