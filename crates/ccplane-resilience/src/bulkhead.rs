use std::sync::Arc;

use ccplane_domain::ControlPlaneError;
use tokio::sync::Semaphore;

/// Bounds concurrent in-flight work to `ingestConcurrency` (spec.md §5,
/// "Backpressure"). Additional callers past the bound are rejected
/// immediately with `DEPENDENCY_UNAVAILABLE` rather than queued, so callers
/// get a fast "retry later" signal instead of piling up behind the gate.
#[derive(Clone)]
pub struct Bulkhead {
    semaphore: Arc<Semaphore>,
}

impl Bulkhead {
    pub fn new(capacity: usize) -> Self {
        Self { semaphore: Arc::new(Semaphore::new(capacity)) }
    }

    /// Run `call` if a slot is free; otherwise reject without running it.
    pub async fn call<T, F, Fut>(&self, call: F) -> Result<T, ControlPlaneError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, ControlPlaneError>>,
    {
        let permit = match self.semaphore.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                return Err(ControlPlaneError::dependency_unavailable(
                    "ingest concurrency limit reached, retry later",
                ))
            }
        };
        let result = call().await;
        drop(permit);
        result
    }

    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::Barrier;

    #[tokio::test]
    async fn admits_calls_up_to_capacity() {
        let bulkhead = Bulkhead::new(1);
        let result = bulkhead.call(|| async { Ok::<_, ControlPlaneError>(1) }).await;
        assert_eq!(result.unwrap(), 1);
        assert_eq!(bulkhead.available_permits(), 1);
    }

    #[tokio::test]
    async fn rejects_when_saturated() {
        let bulkhead = Bulkhead::new(1);
        let barrier = Arc::new(Barrier::new(2));

        let held = {
            let bulkhead = bulkhead.clone();
            let barrier = barrier.clone();
            tokio::spawn(async move {
                bulkhead
                    .call(|| async move {
                        barrier.wait().await;
                        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                        Ok::<_, ControlPlaneError>(())
                    })
                    .await
            })
        };

        barrier.wait().await;
        let rejected = bulkhead.call(|| async { Ok::<_, ControlPlaneError>(()) }).await;
        assert!(rejected.is_err());
        held.await.unwrap().unwrap();
    }
}
