use std::time::Duration;

use ccplane_domain::ControlPlaneError;
use tokio::time::Instant;

/// A request's remaining time budget (spec.md §5). Every blocking call
/// checks `remaining()` before starting; if it has already elapsed, the
/// call returns `DEADLINE_EXCEEDED` without touching persistence.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    pub fn after(duration: Duration) -> Self {
        Self { at: Instant::now() + duration }
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.at
    }

    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    /// Returns `Err(DEADLINE_EXCEEDED)` if the deadline has already passed;
    /// otherwise `Ok(())`. Call at the top of every suspension point.
    pub fn check(&self) -> Result<(), ControlPlaneError> {
        if self.is_expired() {
            Err(ControlPlaneError::deadline_exceeded("request deadline exceeded"))
        } else {
            Ok(())
        }
    }
}

tokio::task_local! {
    static CURRENT: Deadline;
}

impl Deadline {
    /// Run `fut` with `self` as the ambient deadline for the duration of the
    /// future. The task-local is scoped to `fut` alone, so it is
    /// automatically cleared the moment the request's top-level future
    /// completes — no explicit request-boundary cleanup code is needed.
    pub async fn scope<F: std::future::Future>(self, fut: F) -> F::Output {
        CURRENT.scope(self, fut).await
    }

    /// The ambient deadline set by the innermost enclosing `scope` call, if
    /// any. Suspension points that don't receive a `Deadline` explicitly
    /// fall back to this.
    pub fn current() -> Option<Deadline> {
        CURRENT.try_with(|d| *d).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_deadline_is_not_expired() {
        let d = Deadline::after(Duration::from_secs(5));
        assert!(!d.is_expired());
        assert!(d.check().is_ok());
    }

    #[tokio::test]
    async fn already_elapsed_deadline_is_expired() {
        let d = Deadline::after(Duration::from_millis(0));
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(d.is_expired());
        assert!(d.check().is_err());
    }

    #[tokio::test]
    async fn scope_sets_and_clears_ambient_deadline() {
        assert!(Deadline::current().is_none());
        let d = Deadline::after(Duration::from_secs(1));
        d.scope(async {
            assert!(Deadline::current().is_some());
        })
        .await;
        assert!(Deadline::current().is_none());
    }
}
