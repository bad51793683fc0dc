#[cfg(test)]
mod tests {
    use crate::actor::Actor;
    use crate::ids::{InstanceId, ServiceId, TeamId};
    use crate::instance::ServiceInstance;
    use crate::share::ServiceShare;
    use crate::types::{GranteeType, InstanceStatus, Permission};
    use chrono::{Duration, Utc};
    use std::collections::HashSet;
    use uuid::Uuid;

    #[test]
    fn service_instance_status_drift_invariant_holds_by_default() {
        let inst = ServiceInstance::new(ServiceId::new("svc"), InstanceId::new("i-1"), "dev", Utc::now());
        assert!(inst.invariant_holds());
        assert_eq!(inst.status, InstanceStatus::Unknown);
        assert!(!inst.has_drift);
    }

    #[test]
    fn service_instance_status_drift_invariant_detects_violation() {
        let mut inst = ServiceInstance::new(ServiceId::new("svc"), InstanceId::new("i-1"), "dev", Utc::now());
        inst.status = InstanceStatus::Drift;
        // has_drift intentionally left false to exercise the invariant check itself.
        assert!(!inst.invariant_holds());
    }

    #[test]
    fn share_expired_is_not_effective() {
        let now = Utc::now();
        let share = ServiceShare {
            id: Uuid::new_v4(),
            service_id: ServiceId::new("svc"),
            grantee_type: GranteeType::Team,
            grantee_id: "team_core".into(),
            permissions: HashSet::from([Permission::ViewService]),
            environments: None,
            expires_at: Some(now - Duration::seconds(1)),
            granted_by: "admin".into(),
            created_at: now - Duration::days(1),
        };
        assert!(!share.is_effective(now));
        assert!(!share.grants(Permission::ViewService, None, now));
    }

    #[test]
    fn share_environment_scope_restricts_grant() {
        let now = Utc::now();
        let share = ServiceShare {
            id: Uuid::new_v4(),
            service_id: ServiceId::new("svc"),
            grantee_type: GranteeType::User,
            grantee_id: "u1".into(),
            permissions: HashSet::from([Permission::ViewInstance]),
            environments: Some(HashSet::from(["prod".to_string()])),
            expires_at: None,
            granted_by: "admin".into(),
            created_at: now,
        };
        assert!(share.grants(Permission::ViewInstance, Some("prod"), now));
        assert!(!share.grants(Permission::ViewInstance, Some("dev"), now));
        assert!(!share.grants(Permission::ViewInstance, None, now));
    }

    #[test]
    fn share_permission_not_granted_denies() {
        let now = Utc::now();
        let share = ServiceShare {
            id: Uuid::new_v4(),
            service_id: ServiceId::new("svc"),
            grantee_type: GranteeType::Team,
            grantee_id: TeamId::new("team_core").to_string(),
            permissions: HashSet::from([Permission::ViewService]),
            environments: None,
            expires_at: None,
            granted_by: "admin".into(),
            created_at: now,
        };
        assert!(!share.grants(Permission::Edit, None, now));
    }

    #[test]
    fn actor_display() {
        assert_eq!(Actor::system().to_string(), "system");
        assert_eq!(Actor::system_reap().to_string(), "system-reap");
    }
}
