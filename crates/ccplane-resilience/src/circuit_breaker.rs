use std::sync::Mutex;
use std::time::Duration;

use ccplane_domain::ControlPlaneError;
use tokio::time::Instant;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Closed,
    Open,
    HalfOpen,
}

struct Inner {
    state: State,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
}

/// Breaker over an unreliable downstream call (spec.md §4.6: "circuit-break
/// on repeated publish failures"). Opens after `failure_threshold` consecutive
/// failures; stays open for `reset_after`, then allows one probe call through
/// (half-open) to decide whether to close again.
pub struct CircuitBreaker {
    failure_threshold: u32,
    reset_after: Duration,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, reset_after: Duration) -> Self {
        Self {
            failure_threshold,
            reset_after,
            inner: Mutex::new(Inner { state: State::Closed, consecutive_failures: 0, opened_at: None }),
        }
    }

    /// Run `call` if the breaker allows it; otherwise return
    /// `DEPENDENCY_UNAVAILABLE` without invoking `call` at all.
    pub async fn call<T, F, Fut>(&self, call: F) -> Result<T, ControlPlaneError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, ControlPlaneError>>,
    {
        if !self.allow_attempt() {
            return Err(ControlPlaneError::dependency_unavailable("circuit breaker open"));
        }
        match call().await {
            Ok(v) => {
                self.record_success();
                Ok(v)
            }
            Err(e) => {
                self.record_failure();
                Err(e)
            }
        }
    }

    fn allow_attempt(&self) -> bool {
        let mut inner = self.inner.lock().expect("circuit breaker mutex poisoned");
        match inner.state {
            State::Closed => true,
            State::HalfOpen => true,
            State::Open => {
                let elapsed = inner.opened_at.map(|at| at.elapsed()).unwrap_or(Duration::MAX);
                if elapsed >= self.reset_after {
                    inner.state = State::HalfOpen;
                    true
                } else {
                    false
                }
            }
        }
    }

    fn record_success(&self) {
        let mut inner = self.inner.lock().expect("circuit breaker mutex poisoned");
        inner.consecutive_failures = 0;
        inner.state = State::Closed;
        inner.opened_at = None;
    }

    fn record_failure(&self) {
        let mut inner = self.inner.lock().expect("circuit breaker mutex poisoned");
        match inner.state {
            State::HalfOpen => {
                inner.state = State::Open;
                inner.opened_at = Some(Instant::now());
            }
            _ => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.failure_threshold {
                    warn!(
                        consecutive_failures = inner.consecutive_failures,
                        "circuit breaker tripped open"
                    );
                    inner.state = State::Open;
                    inner.opened_at = Some(Instant::now());
                }
            }
        }
    }

    pub fn is_open(&self) -> bool {
        self.inner.lock().expect("circuit breaker mutex poisoned").state == State::Open
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn failing() -> Result<(), ControlPlaneError> {
        Err(ControlPlaneError::dependency_unavailable("boom"))
    }

    async fn succeeding() -> Result<(), ControlPlaneError> {
        Ok(())
    }

    #[tokio::test]
    async fn stays_closed_below_threshold() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(30));
        let _ = breaker.call(failing).await;
        let _ = breaker.call(failing).await;
        assert!(!breaker.is_open());
    }

    #[tokio::test]
    async fn opens_after_consecutive_failures_reach_threshold() {
        let breaker = CircuitBreaker::new(2, Duration::from_secs(30));
        let _ = breaker.call(failing).await;
        let _ = breaker.call(failing).await;
        assert!(breaker.is_open());
    }

    #[tokio::test]
    async fn open_breaker_short_circuits_without_calling() {
        let breaker = CircuitBreaker::new(1, Duration::from_secs(30));
        let _ = breaker.call(failing).await;
        assert!(breaker.is_open());
        let result = breaker.call(succeeding).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn half_open_probe_closes_breaker_on_success() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(0));
        let _ = breaker.call(failing).await;
        assert!(breaker.is_open());
        let result = breaker.call(succeeding).await;
        assert!(result.is_ok());
        assert!(!breaker.is_open());
    }

    #[tokio::test]
    async fn half_open_probe_reopens_breaker_on_failure() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(0));
        let _ = breaker.call(failing).await;
        let _ = breaker.call(failing).await;
        assert!(breaker.is_open());
    }
}
