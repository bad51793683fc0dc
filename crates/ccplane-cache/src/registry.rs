use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use ccplane_domain::{IamUser, Permission};

use crate::l2::L2Cache;
use crate::two_level::TwoLevelCache;

/// TTL table for the named caches (spec.md §4.5). Kept as a standalone
/// struct rather than depending on `ccplane-config` directly, so the cache
/// fabric stays a leaf crate; callers build this from `Settings`.
#[derive(Debug, Clone, Copy)]
pub struct CacheTtls {
    pub expected_hash: Duration,
    pub service_resolution: Duration,
    pub permissions: Duration,
    pub csot_fallback: Duration,
    pub idp_fallback: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            expected_hash: Duration::from_secs(60),
            service_resolution: Duration::from_secs(300),
            permissions: Duration::from_secs(30),
            csot_fallback: Duration::from_secs(24 * 3600),
            idp_fallback: Duration::from_secs(5 * 60),
        }
    }
}

/// The set of named caches from spec.md §4.5's table, each a two-level
/// composite sharing (or not) a single optional L2 backend.
pub struct CacheRegistry {
    pub expected_hash: TwoLevelCache<String>,
    pub service_resolution: TwoLevelCache<String>,
    pub permissions: TwoLevelCache<HashSet<Permission>>,
    pub csot_fallback: TwoLevelCache<String>,
    pub idp_fallback: TwoLevelCache<IamUser>,
}

impl CacheRegistry {
    pub fn new(ttls: CacheTtls, l2: Option<Arc<dyn L2Cache>>) -> Self {
        Self {
            expected_hash: TwoLevelCache::new("expected-hash", ttls.expected_hash, l2.clone()),
            service_resolution: TwoLevelCache::new("service-resolution", ttls.service_resolution, l2.clone()),
            permissions: TwoLevelCache::new("permissions", ttls.permissions, l2.clone()),
            csot_fallback: TwoLevelCache::new("csot-fallback", ttls.csot_fallback, l2.clone()),
            idp_fallback: TwoLevelCache::new("idp-fallback", ttls.idp_fallback, l2),
        }
    }

    /// Clear one named cache by the table's key, or all of them when `name`
    /// is `None` — backs `POST cache/clear?cacheName=`.
    pub async fn clear(&self, name: Option<&str>) {
        match name {
            Some("expected-hash") => self.expected_hash.clear().await,
            Some("service-resolution") => self.service_resolution.clear().await,
            Some("permissions") => self.permissions.clear().await,
            Some("csot-fallback") => self.csot_fallback.clear().await,
            Some("idp-fallback") => self.idp_fallback.clear().await,
            Some(_) => {}
            None => {
                self.expected_hash.clear().await;
                self.service_resolution.clear().await;
                self.permissions.clear().await;
                self.csot_fallback.clear().await;
                self.idp_fallback.clear().await;
            }
        }
    }
}

pub fn expected_hash_key(service_id: &str, environment: &str) -> String {
    format!("{service_id}:{environment}")
}

pub fn permissions_key(user_id: &str, service_id: &str) -> String {
    format!("{user_id}:{service_id}")
}
