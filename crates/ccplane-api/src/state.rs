use std::sync::Arc;
use std::time::Duration;

use ccplane_cache::CacheRegistry;
use ccplane_ingest::{DriftService, IngestOrchestrator, RefreshPublisher};
use ccplane_resilience::CircuitBreaker;
use ccplane_store::{
    ApplicationServiceRepository, ApprovalRepository, DriftEventRepository, IamRepository,
    ServiceInstanceRepository, ServiceShareRepository,
};

/// Bound shared by every repository-backed service the HTTP surface needs.
/// `InMemoryStore` and `PostgresStore` both implement every port on a
/// single concrete type, so — like the teacher's single `Arc<dyn
/// StateStore>` — the API layer is generic over one store type rather than
/// three independent ones.
pub trait Store:
    ApplicationServiceRepository
    + ServiceInstanceRepository
    + DriftEventRepository
    + ServiceShareRepository
    + ApprovalRepository
    + IamRepository
{
}

impl<T> Store for T where
    T: ApplicationServiceRepository
        + ServiceInstanceRepository
        + DriftEventRepository
        + ServiceShareRepository
        + ApprovalRepository
        + IamRepository
{
}

pub struct AppState<S> {
    pub orchestrator: Arc<IngestOrchestrator<S, S, S>>,
    pub drift: Arc<DriftService<S>>,
    pub cache: Arc<CacheRegistry>,
    pub refresh_bus: Arc<dyn RefreshPublisher>,
    pub refresh_breaker: Arc<CircuitBreaker>,
    pub auth_token: Arc<String>,
    pub default_deadline: Duration,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            orchestrator: self.orchestrator.clone(),
            drift: self.drift.clone(),
            cache: self.cache.clone(),
            refresh_bus: self.refresh_bus.clone(),
            refresh_breaker: self.refresh_breaker.clone(),
            auth_token: self.auth_token.clone(),
            default_deadline: self.default_deadline,
        }
    }
}
