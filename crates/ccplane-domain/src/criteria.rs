use std::collections::{HashMap, HashSet};

use crate::ids::{ServiceId, TeamId};

/// Query-filter augmentation produced by the Access-Control Evaluator for
/// list endpoints (spec.md §4.3). Repositories OR the two clauses together:
/// a row matches if its owning team is in `user_team_ids`, or its service
/// id is in `shared_service_ids` (optionally further restricted to one of
/// that share's environments).
#[derive(Debug, Clone, Default)]
pub struct Criteria {
    /// Admins get an unfiltered criteria — every row matches regardless of
    /// the other fields.
    pub unrestricted: bool,
    pub user_team_ids: HashSet<TeamId>,
    /// `None` environment set means the share is unscoped (all
    /// environments); `Some(envs)` restricts matches to those environments.
    pub shared_service_ids: HashMap<ServiceId, Option<HashSet<String>>>,
}

impl Criteria {
    pub fn unrestricted() -> Self {
        Self { unrestricted: true, ..Default::default() }
    }

    pub fn matches_service(&self, service_id: &ServiceId, owner_team_id: Option<&TeamId>) -> bool {
        if self.unrestricted {
            return true;
        }
        if let Some(owner) = owner_team_id {
            if self.user_team_ids.contains(owner) {
                return true;
            }
        }
        self.shared_service_ids.contains_key(service_id)
    }

    pub fn matches_instance(
        &self,
        service_id: &ServiceId,
        owner_team_id: Option<&TeamId>,
        environment: &str,
    ) -> bool {
        if self.unrestricted {
            return true;
        }
        if let Some(owner) = owner_team_id {
            if self.user_team_ids.contains(owner) {
                return true;
            }
        }
        match self.shared_service_ids.get(service_id) {
            Some(Some(envs)) => envs.contains(environment),
            Some(None) => true,
            None => false,
        }
    }
}
