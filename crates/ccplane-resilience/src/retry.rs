use std::future::Future;

use ccplane_domain::{ControlPlaneError, ErrorKind};
use tracing::debug;

/// Retry `attempt` up to `max_retries` additional times whenever it returns
/// a `Conflict` error, re-invoking the closure to get a fresh attempt each
/// time (the caller is expected to re-read state before retrying). Any
/// other error kind is returned immediately. Exhausting all retries
/// surfaces the last `Conflict` verbatim — spec.md §4.4/§5 call this
/// "retried internally up to N times before surfacing".
pub async fn retry_on_conflict<T, F, Fut>(max_retries: u32, mut attempt: F) -> Result<T, ControlPlaneError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ControlPlaneError>>,
{
    let mut last_err = None;
    for try_num in 0..=max_retries {
        match attempt().await {
            Ok(v) => return Ok(v),
            Err(e) if e.kind == ErrorKind::Conflict => {
                debug!(try_num, max_retries, "optimistic write conflict, retrying");
                last_err = Some(e);
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_err.unwrap_or_else(|| ControlPlaneError::conflict("CAS retries exhausted")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_without_retry_when_first_attempt_succeeds() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, ControlPlaneError> = retry_on_conflict(5, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(42) }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_on_conflict_then_succeeds() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, ControlPlaneError> = retry_on_conflict(5, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(ControlPlaneError::conflict("stale version"))
                } else {
                    Ok(7)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausting_retries_surfaces_conflict() {
        let result: Result<u32, ControlPlaneError> =
            retry_on_conflict(2, || async { Err(ControlPlaneError::conflict("always stale")) }).await;
        let err = result.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn non_conflict_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, ControlPlaneError> = retry_on_conflict(5, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ControlPlaneError::not_found("gone")) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
