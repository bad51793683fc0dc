use serde::{Deserialize, Serialize};

use crate::ids::{TeamId, UserId};
use crate::types::Role;

/// Read-only projection of an IdP user, cached by the control plane for
/// ABAC decisions (spec.md §3). Source of truth is the external IdP;
/// nothing here is ever written back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IamUser {
    pub user_id: UserId,
    pub team_ids: Vec<TeamId>,
    pub manager_id: Option<UserId>,
    pub roles: Vec<Role>,
}

impl IamUser {
    pub fn has_role(&self, role: &Role) -> bool {
        self.roles.contains(role)
    }

    pub fn is_sys_admin(&self) -> bool {
        self.has_role(&Role::SysAdmin)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IamTeam {
    pub team_id: TeamId,
    pub name: String,
    pub member_user_ids: Vec<UserId>,
}
