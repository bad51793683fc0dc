use thiserror::Error;

/// Failure taxonomy for approval transitions (spec.md §4.4).
#[derive(Debug, Error)]
pub enum ApprovalError {
    #[error("approval request not found: {0}")]
    NotFound(uuid::Uuid),

    #[error("approval request {0} is already in a terminal state")]
    AlreadyTerminal(uuid::Uuid),

    #[error("approver is not authorized for gate {0}")]
    UnauthorizedGate(String),

    #[error("approver already decided gate {gate} on request {request_id}")]
    DuplicateDecision { request_id: uuid::Uuid, gate: String },

    #[error("only the requester or a SYS_ADMIN may cancel a request")]
    UnauthorizedCancel,

    #[error("optimistic concurrency conflict exhausted retries for request {0}")]
    Conflict(uuid::Uuid),

    #[error("target service {0} is retired")]
    ServiceRetired(String),

    #[error("requester is not a member of the target team and lacks SYS_ADMIN")]
    RequesterNotEligible,

    #[error(transparent)]
    Store(#[from] ccplane_store::StoreError),
}
