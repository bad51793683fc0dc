use std::sync::Arc;
use std::time::Duration;

use ccplane_store::{DriftEventRepository, ServiceInstanceRepository};
use tokio::sync::watch;
use tracing::{error, info};

use crate::sweep::StaleInstanceReaper;

/// Drives `StaleInstanceReaper::sweep_once` on a fixed schedule until told
/// to stop. The teacher has no periodic-worker precedent to copy line for
/// line; this follows the plain `tokio::time::interval` + `select!` idiom,
/// with the same start/stop `tracing::info!` bookends the teacher's
/// long-running `axum::serve` future uses.
pub struct ReaperScheduler<Instances, Drifts> {
    reaper: Arc<StaleInstanceReaper<Instances, Drifts>>,
    interval: Duration,
}

impl<Instances, Drifts> ReaperScheduler<Instances, Drifts>
where
    Instances: ServiceInstanceRepository,
    Drifts: DriftEventRepository,
{
    pub fn new(reaper: Arc<StaleInstanceReaper<Instances, Drifts>>, interval: Duration) -> Self {
        Self { reaper, interval }
    }

    /// Runs until `shutdown` observes `true`. Ticks are skipped (not
    /// queued) if a previous sweep is still running past the interval.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(interval_secs = self.interval.as_secs(), "reaper scheduler starting");
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.reaper.sweep_once(chrono::Utc::now()).await {
                        error!(error = %e, "reaper sweep failed");
                    }
                }
                result = shutdown.changed() => {
                    if result.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("reaper scheduler stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccplane_domain::{InstanceId, ServiceId, ServiceInstance};
    use ccplane_store::InMemoryStore;

    #[tokio::test]
    async fn sweeps_at_least_once_before_shutdown() {
        let store = Arc::new(InMemoryStore::new());
        let last_seen = chrono::Utc::now() - chrono::Duration::seconds(90);
        let mut instance = ServiceInstance::new(ServiceId::new("svc_a"), InstanceId::new("i-1"), "prod", last_seen);
        instance.last_seen_at = last_seen;
        store.upsert(&instance).await.unwrap();

        let reaper = Arc::new(StaleInstanceReaper::new(store.clone(), store.clone(), Duration::from_secs(60), Duration::from_secs(3600)));
        let scheduler = ReaperScheduler::new(reaper, Duration::from_millis(5));

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(async move { scheduler.run(rx).await });

        tokio::time::sleep(Duration::from_millis(30)).await;
        tx.send(true).unwrap();
        handle.await.unwrap();

        let stored = store.get(&ServiceId::new("svc_a"), &InstanceId::new("i-1")).await.unwrap().unwrap();
        assert_eq!(stored.status, ccplane_domain::InstanceStatus::Unhealthy);
    }
}
