pub mod actor;
pub mod approval;
pub mod canonical;
pub mod criteria;
pub mod drift;
pub mod error;
pub mod iam;
pub mod ids;
pub mod instance;
pub mod service;
pub mod share;
#[cfg(test)]
mod tests;
pub mod types;

pub use actor::Actor;
pub use approval::{ApprovalDecision, ApprovalRequest, GateRequirement, RequesterSnapshot};
pub use canonical::{canonicalize, hash_canonical, ConfigDescriptor};
pub use criteria::Criteria;
pub use drift::{DriftEvent, DriftStatistics};
pub use error::{ControlPlaneError, DomainError, ErrorKind};
pub use iam::{IamTeam, IamUser};
pub use ids::{InstanceId, InstanceKey, ServiceId, TeamId, UserId};
pub use instance::ServiceInstance;
pub use service::ApplicationService;
pub use share::ServiceShare;
pub use types::{
    ApprovalRequestType, ApprovalStatus, DecisionValue, DriftSeverity, DriftStatus, Gate,
    GranteeType, InstanceStatus, Lifecycle, Permission, Role,
};
