use thiserror::Error;

/// Failure taxonomy for heartbeat ingestion (spec.md §4.1). `CsotUnavailable`
/// is deliberately absent here — that path is degraded-soft, not a failure:
/// the heartbeat is still accepted and the caller gets `IngestOutcome::Unknown`.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("service '{0}' is not registered and auto-registration is disabled")]
    UnknownService(String),

    #[error("request deadline exceeded before the heartbeat could be persisted")]
    DeadlineExceeded,

    #[error("ingest concurrency limit reached, retry later")]
    Backpressure,

    #[error(transparent)]
    Store(#[from] ccplane_store::StoreError),
}

impl From<ccplane_domain::ControlPlaneError> for IngestError {
    fn from(e: ccplane_domain::ControlPlaneError) -> Self {
        match e.kind {
            ccplane_domain::ErrorKind::DeadlineExceeded => IngestError::DeadlineExceeded,
            ccplane_domain::ErrorKind::DependencyUnavailable => IngestError::Backpressure,
            _ => IngestError::Store(ccplane_store::StoreError::Internal(e.message)),
        }
    }
}

/// The reverse direction — needed so `IngestOrchestrator` can route a
/// heartbeat through `Bulkhead::call`/`CircuitBreaker::call`, which both
/// speak `ControlPlaneError`.
impl From<IngestError> for ccplane_domain::ControlPlaneError {
    fn from(e: IngestError) -> Self {
        match e {
            IngestError::UnknownService(s) => {
                ccplane_domain::ControlPlaneError::not_found(format!("unknown service: {s}"))
            }
            IngestError::DeadlineExceeded => {
                ccplane_domain::ControlPlaneError::deadline_exceeded("request deadline exceeded")
            }
            IngestError::Backpressure => ccplane_domain::ControlPlaneError::dependency_unavailable(
                "ingest concurrency limit reached, retry later",
            ),
            IngestError::Store(e) => ccplane_domain::ControlPlaneError::internal(e.to_string()),
        }
    }
}
