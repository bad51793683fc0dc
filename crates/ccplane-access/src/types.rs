use ccplane_domain::{IamUser, Permission, Role, ServiceId, TeamId, UserId};

/// Request-scoped identity, derived from validated bearer credentials
/// (spec.md §4.3). Built once per request from the cached `IamUser`
/// projection.
#[derive(Debug, Clone)]
pub struct UserContext {
    pub user_id: UserId,
    pub team_ids: Vec<TeamId>,
    pub manager_id: Option<UserId>,
    pub roles: Vec<Role>,
}

impl UserContext {
    pub fn is_sys_admin(&self) -> bool {
        self.roles.contains(&Role::SysAdmin)
    }

    pub fn is_member_of(&self, team_id: &TeamId) -> bool {
        self.team_ids.contains(team_id)
    }
}

impl From<&IamUser> for UserContext {
    fn from(u: &IamUser) -> Self {
        Self {
            user_id: u.user_id.clone(),
            team_ids: u.team_ids.clone(),
            manager_id: u.manager_id.clone(),
            roles: u.roles.clone(),
        }
    }
}

/// The operation a caller is attempting, reduced to the single permission
/// it requires.
#[derive(Debug, Clone, Copy)]
pub struct Action {
    pub permission: Permission,
}

impl Action {
    pub fn new(permission: Permission) -> Self {
        Self { permission }
    }
}

/// The entity an `Action` targets, carrying the attributes the policy
/// needs without the evaluator having to re-fetch the owning service
/// itself.
#[derive(Debug, Clone)]
pub struct Resource {
    pub service_id: ServiceId,
    pub owner_team_id: Option<TeamId>,
    pub environment: Option<String>,
}

impl Resource {
    pub fn service(service_id: ServiceId, owner_team_id: Option<TeamId>) -> Self {
        Self { service_id, owner_team_id, environment: None }
    }

    pub fn scoped(service_id: ServiceId, owner_team_id: Option<TeamId>, environment: impl Into<String>) -> Self {
        Self { service_id, owner_team_id, environment: Some(environment.into()) }
    }
}
