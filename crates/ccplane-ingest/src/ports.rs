use async_trait::async_trait;
use ccplane_domain::ControlPlaneError;

/// Outbound port to the Configuration Source-of-Truth (spec.md §1, "the
/// CSoT itself" is out of scope; only this read-only port is in scope).
/// Grounded on the teacher's `Driver` trait shape — an outbound adapter
/// with a fake implementation usable in tests.
#[async_trait]
pub trait CsotAdapter: Send + Sync + 'static {
    /// The expected hash for `(service_id, environment)`, or `Ok(None)` if
    /// the CSoT has no published config for that pair yet. A transport or
    /// network failure is `Err(DEPENDENCY_UNAVAILABLE)`.
    async fn fetch_expected_hash(&self, service_id: &str, environment: &str) -> Result<Option<String>, ControlPlaneError>;
}

/// Outbound port to the event bus (spec.md §4.6). Fire-and-forget,
/// at-least-once; failures are recorded by the caller's circuit breaker,
/// never surfaced to the heartbeat caller.
#[async_trait]
pub trait RefreshPublisher: Send + Sync + 'static {
    async fn publish(&self, destination: &str) -> Result<(), ControlPlaneError>;
}

/// In-memory fakes for tests: a programmable CSoT and a bus that records
/// every message it was asked to send.
pub mod fakes {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct FakeCsot {
        hashes: Mutex<HashMap<String, String>>,
        fail: Mutex<bool>,
    }

    impl FakeCsot {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set(&self, service_id: &str, environment: &str, hash: impl Into<String>) {
            self.hashes.lock().unwrap().insert(format!("{service_id}:{environment}"), hash.into());
        }

        pub fn set_failing(&self, failing: bool) {
            *self.fail.lock().unwrap() = failing;
        }
    }

    #[async_trait]
    impl CsotAdapter for FakeCsot {
        async fn fetch_expected_hash(&self, service_id: &str, environment: &str) -> Result<Option<String>, ControlPlaneError> {
            if *self.fail.lock().unwrap() {
                return Err(ControlPlaneError::dependency_unavailable("CSoT unreachable"));
            }
            Ok(self.hashes.lock().unwrap().get(&format!("{service_id}:{environment}")).cloned())
        }
    }

    #[derive(Default)]
    pub struct RecordingBus {
        pub published: Mutex<Vec<String>>,
    }

    impl RecordingBus {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn messages(&self) -> Vec<String> {
            self.published.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RefreshPublisher for RecordingBus {
        async fn publish(&self, destination: &str) -> Result<(), ControlPlaneError> {
            self.published.lock().unwrap().push(destination.to_string());
            Ok(())
        }
    }
}
