use serde::{Deserialize, Serialize};

use crate::ids::UserId;

/// Explicit "who did this" parameter threaded through every mutating call,
/// replacing the ambient thread-local security context flagged in spec.md
/// §9. Audit fields are always set from this value, never inferred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Actor {
    User(UserId),
    /// The control plane itself, e.g. closing a drift event because a
    /// heartbeat matched again, or the reaper deleting a stale instance.
    System(&'static str),
}

impl Actor {
    pub fn system() -> Self {
        Actor::System("system")
    }

    pub fn system_reap() -> Self {
        Actor::System("system-reap")
    }
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Actor::User(u) => write!(f, "{u}"),
            Actor::System(s) => write!(f, "{s}"),
        }
    }
}
