use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::ids::{InstanceId, ServiceId};
use crate::types::InstanceStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInstance {
    pub service_id: ServiceId,
    pub instance_id: InstanceId,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub environment: String,
    pub version: Option<String>,
    pub applied_hash: Option<String>,
    pub expected_hash: Option<String>,
    pub status: InstanceStatus,
    pub has_drift: bool,
    pub drift_detected_at: Option<DateTime<Utc>>,
    pub last_seen_at: DateTime<Utc>,
    pub metadata: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ServiceInstance {
    pub fn new(
        service_id: ServiceId,
        instance_id: InstanceId,
        environment: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            service_id,
            instance_id,
            host: None,
            port: None,
            environment: environment.into(),
            version: None,
            applied_hash: None,
            expected_hash: None,
            status: InstanceStatus::Unknown,
            has_drift: false,
            drift_detected_at: None,
            last_seen_at: now,
            metadata: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// `true` ⇔ the instance's `status == DRIFT`. Asserted as an invariant
    /// by spec.md §3 (`status == DRIFT ⇔ hasDrift == true`) — kept as a
    /// method instead of a separately-set field so the invariant cannot
    /// drift apart from the enum that backs it.
    pub fn invariant_holds(&self) -> bool {
        (self.status == InstanceStatus::Drift) == self.has_drift
    }

    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.last_seen_at
    }
}
