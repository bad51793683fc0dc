mod evaluator;
mod types;

pub use evaluator::{AccessEvaluator, PermissionCacheInvalidator};
pub use types::{Action, Resource, UserContext};

#[cfg(test)]
mod tests {
    use super::*;
    use ccplane_cache::{CacheRegistry, CacheTtls};
    use ccplane_domain::{GranteeType, Permission, Role, ServiceId, ServiceShare, TeamId, UserId};
    use ccplane_store::{InMemoryStore, ServiceShareRepository};
    use chrono::Utc;
    use std::collections::HashSet;
    use std::sync::Arc;
    use uuid::Uuid;

    fn ctx(user: &str, teams: &[&str], roles: Vec<Role>) -> UserContext {
        UserContext {
            user_id: UserId::new(user),
            team_ids: teams.iter().map(|t| TeamId::new(*t)).collect(),
            manager_id: None,
            roles,
        }
    }

    fn evaluator() -> AccessEvaluator<InMemoryStore> {
        AccessEvaluator::new(Arc::new(InMemoryStore::new()), Arc::new(CacheRegistry::new(CacheTtls::default(), None)))
    }

    #[tokio::test]
    async fn sys_admin_is_always_allowed() {
        let evaluator = evaluator();
        let ctx = ctx("u1", &[], vec![Role::SysAdmin]);
        let resource = Resource::service(ServiceId::new("svc_a"), Some(TeamId::new("team_other")));
        assert!(evaluator.evaluate(&ctx, Action::new(Permission::Admin), &resource).await);
    }

    #[tokio::test]
    async fn owner_team_member_is_allowed() {
        let evaluator = evaluator();
        let ctx = ctx("u1", &["team_core"], vec![]);
        let resource = Resource::service(ServiceId::new("svc_a"), Some(TeamId::new("team_core")));
        assert!(evaluator.evaluate(&ctx, Action::new(Permission::Edit), &resource).await);
    }

    #[tokio::test]
    async fn non_owner_without_share_is_denied() {
        let evaluator = evaluator();
        let ctx = ctx("u1", &["team_other"], vec![]);
        let resource = Resource::service(ServiceId::new("svc_a"), Some(TeamId::new("team_core")));
        assert!(!evaluator.evaluate(&ctx, Action::new(Permission::Edit), &resource).await);
    }

    #[tokio::test]
    async fn share_grants_access_when_permission_and_environment_match() {
        let store = Arc::new(InMemoryStore::new());
        let share = ServiceShare {
            id: Uuid::new_v4(),
            service_id: ServiceId::new("svc_a"),
            grantee_type: GranteeType::Team,
            grantee_id: "team_other".to_string(),
            permissions: HashSet::from([Permission::ViewService]),
            environments: Some(HashSet::from(["prod".to_string()])),
            expires_at: None,
            granted_by: "admin".to_string(),
            created_at: Utc::now(),
        };
        store.upsert(&share).await.unwrap();
        let evaluator = AccessEvaluator::new(store, Arc::new(CacheRegistry::new(CacheTtls::default(), None)));
        let ctx = ctx("u1", &["team_other"], vec![]);
        let resource = Resource::scoped(ServiceId::new("svc_a"), Some(TeamId::new("team_core")), "prod");
        assert!(evaluator.evaluate(&ctx, Action::new(Permission::ViewService), &resource).await);

        let dev_resource = Resource::scoped(ServiceId::new("svc_a"), Some(TeamId::new("team_core")), "dev");
        assert!(!evaluator.evaluate(&ctx, Action::new(Permission::ViewService), &dev_resource).await);
    }

    #[tokio::test]
    async fn criteria_for_sys_admin_is_unrestricted() {
        let evaluator = evaluator();
        let ctx = ctx("admin", &[], vec![Role::SysAdmin]);
        let criteria = evaluator.criteria_for(&ctx).await;
        assert!(criteria.unrestricted);
    }
}
