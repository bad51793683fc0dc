use thiserror::Error;

/// Coarse error taxonomy shared by every core service (spec §7). Transport
/// adapters map this to wire codes; it is never itself serialized to the
/// wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    Unauthenticated,
    Unauthorized,
    NotFound,
    Conflict,
    AlreadyTerminal,
    DeadlineExceeded,
    DependencyUnavailable,
    Internal,
}

/// Typed, kind-discriminated error used by every service method instead of
/// exceptions-for-control-flow (spec §9).
#[derive(Debug, Error)]
#[error("{kind:?}: {message}")]
pub struct ControlPlaneError {
    pub kind: ErrorKind,
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ControlPlaneError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), source: None }
    }

    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self { kind, message: message.into(), source: Some(Box::new(source)) }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn already_terminal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AlreadyTerminal, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    pub fn deadline_exceeded(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DeadlineExceeded, message)
    }

    pub fn dependency_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DependencyUnavailable, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("invalid service id: {0}")]
    InvalidServiceId(String),

    #[error("invalid instance id: {0}")]
    InvalidInstanceId(String),

    #[error("service has no environments")]
    NoEnvironments,

    #[error("invalid configuration hash: {0}")]
    InvalidHash(String),

    #[error("invalid canonical config: {0}")]
    InvalidConfig(String),
}

impl From<DomainError> for ControlPlaneError {
    fn from(e: DomainError) -> Self {
        ControlPlaneError::with_source(ErrorKind::InvalidInput, e.to_string(), e)
    }
}
