use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::actor::Actor;
use crate::ids::{ServiceId, TeamId};
use crate::types::Lifecycle;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationService {
    pub id: ServiceId,
    pub display_name: String,
    pub owner_team_id: Option<TeamId>,
    pub environments: Vec<String>,
    pub tags: Vec<String>,
    pub lifecycle: Lifecycle,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Actor,
    pub updated_by: Actor,
}

impl ApplicationService {
    pub fn new(
        id: ServiceId,
        display_name: impl Into<String>,
        environments: Vec<String>,
        by: Actor,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            owner_team_id: None,
            environments,
            tags: Vec::new(),
            lifecycle: Lifecycle::Active,
            created_at: now,
            updated_at: now,
            created_by: by.clone(),
            updated_by: by,
        }
    }

    pub fn is_retired(&self) -> bool {
        matches!(self.lifecycle, Lifecycle::Retired)
    }
}
