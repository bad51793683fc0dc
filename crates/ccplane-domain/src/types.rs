use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Lifecycle {
    Active,
    Deprecated,
    Retired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InstanceStatus {
    Healthy,
    Unhealthy,
    Drift,
    Unknown,
}

impl std::fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            InstanceStatus::Healthy => "HEALTHY",
            InstanceStatus::Unhealthy => "UNHEALTHY",
            InstanceStatus::Drift => "DRIFT",
            InstanceStatus::Unknown => "UNKNOWN",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DriftSeverity {
    Low,
    #[serde(rename = "MED")]
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DriftStatus {
    Detected,
    Acknowledged,
    Resolving,
    Resolved,
    Ignored,
}

impl DriftStatus {
    /// A drift event is "open" (non-terminal) in every state except the two
    /// terminal ones. Exactly the states spec.md §3 calls "non-terminal".
    pub fn is_terminal(&self) -> bool {
        matches!(self, DriftStatus::Resolved | DriftStatus::Ignored)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GranteeType {
    Team,
    User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Permission {
    ViewService,
    ViewInstance,
    ViewDrift,
    Edit,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ApprovalRequestType {
    AssignServiceToTeam,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl ApprovalStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ApprovalStatus::Pending)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DecisionValue {
    Approve,
    Reject,
}

/// A named set of approvers a quorum must be collected from, e.g.
/// `SYS_ADMIN` or `LINE_MANAGER`. Modeled as a plain string rather than a
/// closed enum because spec.md §4.4 calls required gates "configurable per
/// request type" — new gate names must not require a domain-crate release.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Gate(pub String);

impl Gate {
    pub const SYS_ADMIN: &'static str = "SYS_ADMIN";
    pub const LINE_MANAGER: &'static str = "LINE_MANAGER";

    pub fn new(s: impl Into<String>) -> Self {
        Gate(s.into())
    }

    pub fn sys_admin() -> Self {
        Gate::new(Self::SYS_ADMIN)
    }

    pub fn line_manager() -> Self {
        Gate::new(Self::LINE_MANAGER)
    }
}

impl std::fmt::Display for Gate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A role held by a user, as projected from the external IdP. `SysAdmin` is
/// the only role with built-in meaning to the access evaluator and the
/// approval gate check (spec.md §4.3, §4.4); any other role name passes
/// through opaquely for share/criteria bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    SysAdmin,
    Other(String),
}

impl Role {
    pub fn from_str(s: &str) -> Self {
        if s == "SYS_ADMIN" {
            Role::SysAdmin
        } else {
            Role::Other(s.to_string())
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::SysAdmin => write!(f, "SYS_ADMIN"),
            Role::Other(s) => write!(f, "{s}"),
        }
    }
}
