use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::ids::ServiceId;
use crate::types::{GranteeType, Permission};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceShare {
    pub id: Uuid,
    pub service_id: ServiceId,
    pub grantee_type: GranteeType,
    /// `TeamId` or `UserId` as a bare string — the grantee kind is carried
    /// separately in `grantee_type` so lookups don't need to try both ID
    /// types.
    pub grantee_id: String,
    pub permissions: HashSet<Permission>,
    pub environments: Option<HashSet<String>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub granted_by: String,
    pub created_at: DateTime<Utc>,
}

impl ServiceShare {
    pub fn is_effective(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(exp) => now < exp,
            None => true,
        }
    }

    pub fn grants(&self, permission: Permission, environment: Option<&str>, now: DateTime<Utc>) -> bool {
        if !self.is_effective(now) || !self.permissions.contains(&permission) {
            return false;
        }
        match (&self.environments, environment) {
            (Some(envs), Some(env)) => envs.contains(env),
            (Some(_), None) => false,
            (None, _) => true,
        }
    }
}
