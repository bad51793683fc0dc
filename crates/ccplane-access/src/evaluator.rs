use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use ccplane_domain::{Criteria, GranteeType, Permission};
use ccplane_cache::{permissions_key, CacheRegistry};
use ccplane_store::ServiceShareRepository;
use chrono::Utc;
use tracing::debug;

use crate::types::{Action, Resource, UserContext};

/// Port the approval workflow invalidates through when a share or
/// ownership change makes a cached permission set stale (spec.md §4.4's
/// "invalidate the permission cache for all users whose team set
/// intersects the old or new owner"). Kept separate from
/// `AccessEvaluator` so callers outside this crate can depend on the
/// narrow capability without the generic store parameter.
#[async_trait]
pub trait PermissionCacheInvalidator: Send + Sync {
    async fn invalidate(&self, user_id: &str, service_id: &str);
}

/// Gates every service-scoped read/write (spec.md §4.3). Evaluates the
/// ordered policy — SYS_ADMIN, then ownership, then non-expired shares —
/// and produces the `Criteria` augmentation list endpoints need.
pub struct AccessEvaluator<S> {
    shares: Arc<S>,
    cache: Arc<CacheRegistry>,
}

impl<S: ServiceShareRepository> AccessEvaluator<S> {
    pub fn new(shares: Arc<S>, cache: Arc<CacheRegistry>) -> Self {
        Self { shares, cache }
    }

    /// `ALLOW`/`DENY` for one `(UserContext, Action, Resource)` triple.
    pub async fn evaluate(&self, ctx: &UserContext, action: Action, resource: &Resource) -> bool {
        if ctx.is_sys_admin() {
            return true;
        }
        if let Some(owner) = &resource.owner_team_id {
            if ctx.is_member_of(owner) {
                return true;
            }
        }

        let perms = self.effective_permissions(ctx, &resource.service_id).await;
        if !perms.contains(&action.permission) {
            debug!(user_id = %ctx.user_id, service_id = %resource.service_id, "access denied: no matching share permission");
            return false;
        }

        // The cached set above ignores environment scoping; re-check live
        // shares so an environment-restricted grant can't leak to a
        // resource in a different environment.
        self.share_grants_live(ctx, action, resource).await
    }

    async fn share_grants_live(&self, ctx: &UserContext, action: Action, resource: &Resource) -> bool {
        let now = Utc::now();
        let shares = match self.shares.list_for_service(&resource.service_id).await {
            Ok(shares) => shares,
            Err(_) => return false,
        };
        shares.iter().any(|share| {
            let grantee_matches = match share.grantee_type {
                GranteeType::Team => ctx.team_ids.iter().any(|t| t.as_str() == share.grantee_id),
                GranteeType::User => ctx.user_id.as_str() == share.grantee_id,
            };
            grantee_matches && share.grants(action.permission, resource.environment.as_deref(), now)
        })
    }

    /// `(userId, serviceId) -> effectivePermissions`, cached with the
    /// `permissions` named cache (TTL 30s, spec.md §4.3). Ignores
    /// environment scoping — callers re-validate that live.
    pub async fn effective_permissions(&self, ctx: &UserContext, service_id: &ccplane_domain::ServiceId) -> HashSet<Permission> {
        let key = permissions_key(ctx.user_id.as_str(), service_id.as_str());
        if let Some(cached) = self.cache.permissions.get(&key).await {
            return cached;
        }

        let mut perms = HashSet::new();
        if let Ok(shares) = self.shares.list_for_service(service_id).await {
            let now = Utc::now();
            for share in shares {
                let grantee_matches = match share.grantee_type {
                    GranteeType::Team => ctx.team_ids.iter().any(|t| t.as_str() == share.grantee_id),
                    GranteeType::User => ctx.user_id.as_str() == share.grantee_id,
                };
                if grantee_matches && share.is_effective(now) {
                    perms.extend(share.permissions.iter().copied());
                }
            }
        }
        self.cache.permissions.put(key, &perms).await;
        perms
    }

    /// Invalidate the cached permission set for one user/service pair —
    /// called on share grant/revoke or ownership transfer.
    pub async fn invalidate(&self, user_id: &str, service_id: &str) {
        let key = permissions_key(user_id, service_id);
        self.cache.permissions.invalidate(&key).await;
    }

    /// Build the `Criteria` augmentation for list endpoints (spec.md §4.3
    /// "Query filtering"). Admins get an unrestricted criteria.
    pub async fn criteria_for(&self, ctx: &UserContext) -> Criteria {
        if ctx.is_sys_admin() {
            return Criteria::unrestricted();
        }
        let mut criteria = Criteria { unrestricted: false, user_team_ids: ctx.team_ids.iter().cloned().collect(), shared_service_ids: Default::default() };
        if let Ok(shares) = self.shares.list_for_grantee(GranteeType::User, ctx.user_id.as_str()).await {
            self.merge_shares(&mut criteria, shares);
        }
        for team in &ctx.team_ids {
            if let Ok(shares) = self.shares.list_for_grantee(GranteeType::Team, team.as_str()).await {
                self.merge_shares(&mut criteria, shares);
            }
        }
        criteria
    }

    fn merge_shares(&self, criteria: &mut Criteria, shares: Vec<ccplane_domain::ServiceShare>) {
        let now = Utc::now();
        for share in shares {
            if !share.is_effective(now) {
                continue;
            }
            criteria
                .shared_service_ids
                .entry(share.service_id.clone())
                .and_modify(|existing| {
                    // widen toward "all environments" if either grant is unscoped
                    if existing.is_some() {
                        match &share.environments {
                            None => *existing = None,
                            Some(envs) => {
                                if let Some(e) = existing {
                                    e.extend(envs.iter().cloned());
                                }
                            }
                        }
                    }
                })
                .or_insert_with(|| share.environments.clone());
        }
    }
}

#[async_trait]
impl<S: ServiceShareRepository> PermissionCacheInvalidator for AccessEvaluator<S> {
    async fn invalidate(&self, user_id: &str, service_id: &str) {
        AccessEvaluator::invalidate(self, user_id, service_id).await
    }
}
