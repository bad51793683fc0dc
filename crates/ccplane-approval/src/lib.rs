mod error;
mod service;

pub use error::ApprovalError;
pub use service::{ApprovalService, ApprovalServiceConfig};

#[cfg(test)]
mod tests {
    use super::*;
    use ccplane_access::AccessEvaluator;
    use ccplane_cache::{CacheRegistry, CacheTtls};
    use ccplane_domain::{
        Actor, ApplicationService, ApprovalStatus, DecisionValue, Gate, GateRequirement, IamUser,
        Lifecycle, RequesterSnapshot, Role, ServiceId, TeamId, UserId,
    };
    use ccplane_store::{ApplicationServiceRepository, ApprovalRepository, IamRepository, InMemoryStore};
    use chrono::Utc;
    use std::sync::Arc;

    fn service(id: &str) -> ApplicationService {
        ApplicationService::new(ServiceId::new(id), "payments", vec!["prod".to_string()], Actor::system(), Utc::now())
    }

    fn snapshot(teams: &[&str], manager: Option<&str>, roles: Vec<Role>) -> RequesterSnapshot {
        RequesterSnapshot {
            team_ids: teams.iter().map(|t| TeamId::new(*t)).collect(),
            manager_id: manager.map(UserId::new),
            roles,
        }
    }

    type Harness = ApprovalService<InMemoryStore, InMemoryStore, InMemoryStore, AccessEvaluator<InMemoryStore>>;

    async fn harness() -> (Arc<InMemoryStore>, Harness) {
        let store = Arc::new(InMemoryStore::new());
        store.upsert(&service("svc_a")).await.unwrap();
        store
            .upsert_user(&IamUser { user_id: UserId::new("admin1"), team_ids: vec![], manager_id: None, roles: vec![Role::SysAdmin] })
            .await
            .unwrap();
        let invalidator = Arc::new(AccessEvaluator::new(store.clone(), Arc::new(CacheRegistry::new(CacheTtls::default(), None))));
        let svc = ApprovalService::new(store.clone(), store.clone(), store.clone(), invalidator, ApprovalServiceConfig::default());
        (store, svc)
    }

    #[tokio::test]
    async fn create_request_rejects_ineligible_requester() {
        let (_, svc) = harness().await;
        let err = svc
            .create_request(UserId::new("u1"), snapshot(&["team_other"], None, vec![]), ServiceId::new("svc_a"), TeamId::new("team_core"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ApprovalError::RequesterNotEligible));
    }

    #[tokio::test]
    async fn create_request_rejects_retired_service() {
        let (store, svc) = harness().await;
        let mut retired = service("svc_b");
        retired.lifecycle = Lifecycle::Retired;
        store.upsert(&retired).await.unwrap();

        let err = svc
            .create_request(UserId::new("u1"), snapshot(&["team_core"], None, vec![]), ServiceId::new("svc_b"), TeamId::new("team_core"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ApprovalError::ServiceRetired(_)));
    }

    #[tokio::test]
    async fn full_quorum_approves_and_transfers_ownership() {
        let (store, svc) = harness().await;
        let request = svc
            .create_request(
                UserId::new("requester"),
                snapshot(&["team_core"], Some("mgr1"), vec![]),
                ServiceId::new("svc_a"),
                TeamId::new("team_core"),
                None,
            )
            .await
            .unwrap();

        let after_sysadmin = svc.decide(request.id, UserId::new("admin1"), Gate::sys_admin(), DecisionValue::Approve).await.unwrap();
        assert_eq!(after_sysadmin.status, ApprovalStatus::Pending);

        let approved = svc.decide(request.id, UserId::new("mgr1"), Gate::line_manager(), DecisionValue::Approve).await.unwrap();
        assert_eq!(approved.status, ApprovalStatus::Approved);

        let updated_service = store.get(&ServiceId::new("svc_a")).await.unwrap().unwrap();
        assert_eq!(updated_service.owner_team_id, Some(TeamId::new("team_core")));
    }

    #[tokio::test]
    async fn reject_short_circuits_regardless_of_other_gates() {
        let (_, svc) = harness().await;
        let request = svc
            .create_request(UserId::new("requester"), snapshot(&["team_core"], Some("mgr1"), vec![]), ServiceId::new("svc_a"), TeamId::new("team_core"), None)
            .await
            .unwrap();
        let rejected = svc.decide(request.id, UserId::new("admin1"), Gate::sys_admin(), DecisionValue::Reject).await.unwrap();
        assert_eq!(rejected.status, ApprovalStatus::Rejected);
    }

    #[tokio::test]
    async fn unauthorized_approver_is_rejected() {
        let (_, svc) = harness().await;
        let request = svc
            .create_request(UserId::new("requester"), snapshot(&["team_core"], None, vec![]), ServiceId::new("svc_a"), TeamId::new("team_core"), None)
            .await
            .unwrap();
        let err = svc.decide(request.id, UserId::new("random"), Gate::sys_admin(), DecisionValue::Approve).await.unwrap_err();
        assert!(matches!(err, ApprovalError::UnauthorizedGate(_)));
    }

    #[tokio::test]
    async fn duplicate_decision_on_same_gate_is_rejected() {
        let (_, svc) = harness().await;
        let request = svc
            .create_request(
                UserId::new("requester"),
                snapshot(&["team_core"], None, vec![]),
                ServiceId::new("svc_a"),
                TeamId::new("team_core"),
                Some(vec![GateRequirement { gate: Gate::sys_admin(), min_approvals: 2 }]),
            )
            .await
            .unwrap();
        svc.decide(request.id, UserId::new("admin1"), Gate::sys_admin(), DecisionValue::Approve).await.unwrap();
        let err = svc.decide(request.id, UserId::new("admin1"), Gate::sys_admin(), DecisionValue::Approve).await.unwrap_err();
        assert!(matches!(err, ApprovalError::DuplicateDecision { .. }));
    }

    #[tokio::test]
    async fn concurrent_decisions_on_different_gates_both_count_toward_quorum() {
        // Regression: a genuine CAS conflict between two gates used to make
        // the losing decide() call re-attempt `append_decision` on retry,
        // which returned `AlreadyExists` for its own already-persisted
        // decision and aborted with a spurious `ALREADY_TERMINAL` before its
        // tally was ever reflected in the request — leaving the request
        // stuck below quorum forever.
        let (store, svc) = harness().await;
        let request = svc
            .create_request(
                UserId::new("requester"),
                snapshot(&["team_core"], Some("mgr1"), vec![]),
                ServiceId::new("svc_a"),
                TeamId::new("team_core"),
                None,
            )
            .await
            .unwrap();

        let svc = Arc::new(svc);
        let (a, b) = tokio::join!(
            svc.decide(request.id, UserId::new("admin1"), Gate::sys_admin(), DecisionValue::Approve),
            svc.decide(request.id, UserId::new("mgr1"), Gate::line_manager(), DecisionValue::Approve),
        );
        a.unwrap();
        b.unwrap();

        let decisions = store.list_decisions(request.id).await.unwrap();
        assert_eq!(decisions.len(), 2);

        let final_request = store.get(request.id).await.unwrap().unwrap();
        assert_eq!(final_request.status, ApprovalStatus::Approved);
        assert_eq!(final_request.counts.get(&Gate::sys_admin()).copied(), Some(1));
        assert_eq!(final_request.counts.get(&Gate::line_manager()).copied(), Some(1));
    }

    #[tokio::test]
    async fn cancel_by_requester_succeeds_but_by_stranger_fails() {
        let (_, svc) = harness().await;
        let request = svc
            .create_request(UserId::new("requester"), snapshot(&["team_core"], None, vec![]), ServiceId::new("svc_a"), TeamId::new("team_core"), None)
            .await
            .unwrap();
        let err = svc.cancel(request.id, &UserId::new("stranger"), &[]).await.unwrap_err();
        assert!(matches!(err, ApprovalError::UnauthorizedCancel));

        let cancelled = svc.cancel(request.id, &UserId::new("requester"), &[]).await.unwrap();
        assert_eq!(cancelled.status, ApprovalStatus::Cancelled);
    }
}
