//! Scheduler - runs the reconciler on a fixed interval, forever.
//!
//! Failures are isolated per cycle: whatever a cycle returns or raises is
//! logged and the loop continues. The interval is measured from cycle
//! completion, so the cadence drifts by cycle duration. Shutdown is
//! cooperative and only observed between cycles; an in-flight cycle is
//! always allowed to complete.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{error, info};

use super::reconciler::{Reconciler, SyncOutcome};

/// Runs the sync loop until shutdown is signalled.
pub struct Scheduler {
    reconciler: Reconciler,
    interval: Duration,
}

impl Scheduler {
    /// Creates a scheduler running the given reconciler at `interval`.
    pub fn new(reconciler: Reconciler, interval: Duration) -> Self {
        Self {
            reconciler,
            interval,
        }
    }

    /// Runs cycles until `shutdown` flips to true or its sender drops.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(interval_secs = self.interval.as_secs(), "sync loop started");

        loop {
            match self.reconciler.sync().await {
                Ok(report) => match report.outcome {
                    SyncOutcome::InSync => {
                        info!(active_ports = report.desired.len(), "sync complete: in sync");
                    }
                    SyncOutcome::Updated => {
                        info!(
                            active_ports = report.desired.len(),
                            added = report.to_add.len(),
                            removed = report.to_remove.len(),
                            partial_data = report.partial_data,
                            "sync complete: alias updated"
                        );
                    }
                    SyncOutcome::UpdateFailed => {
                        error!(
                            to_add = ?report.to_add,
                            to_remove = ?report.to_remove,
                            "sync complete: update failed, will retry next cycle"
                        );
                    }
                },
                Err(err) => {
                    error!(error = %err, "sync cycle failed");
                }
            }

            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = sleep(self.interval) => {}
                _ = shutdown.changed() => break,
            }
        }

        info!("sync loop stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::adapters::opnsense::MockAliasStore;
    use crate::adapters::pterodactyl::MockAllocationSource;
    use crate::domain::PortSet;
    use crate::ports::SourceError;

    const ALIAS: &str = "pterodactyl_ports";

    fn scheduler(
        source: MockAllocationSource,
        store: MockAliasStore,
        interval: Duration,
    ) -> (Scheduler, Arc<MockAllocationSource>, Arc<MockAliasStore>) {
        let source = Arc::new(source);
        let store = Arc::new(store);
        let reconciler = Reconciler::new(source.clone(), store.clone(), ALIAS, PortSet::new());
        (Scheduler::new(reconciler, interval), source, store)
    }

    #[tokio::test]
    async fn stops_after_shutdown_signal() {
        let (scheduler, source, _) = scheduler(
            MockAllocationSource::new().with_port("S1", 80),
            MockAliasStore::new(ALIAS),
            Duration::from_millis(5),
        );
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(async move { scheduler.run(rx).await });
        tokio::time::sleep(Duration::from_millis(30)).await;
        tx.send(true).unwrap();
        handle.await.unwrap();

        assert!(source.fetch_count() >= 1);
    }

    #[tokio::test]
    async fn failing_cycles_do_not_stop_the_loop() {
        let (scheduler, source, _) = scheduler(
            MockAllocationSource::new()
                .with_error(SourceError::Unreachable("down".to_string())),
            MockAliasStore::new(ALIAS),
            Duration::from_millis(5),
        );
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(async move { scheduler.run(rx).await });
        tokio::time::sleep(Duration::from_millis(40)).await;
        tx.send(true).unwrap();
        handle.await.unwrap();

        // Several cycles ran despite every one of them failing.
        assert!(source.fetch_count() >= 2);
    }

    #[tokio::test]
    async fn dropped_sender_stops_the_loop() {
        let (scheduler, _, store) = scheduler(
            MockAllocationSource::new().with_port("S1", 80),
            MockAliasStore::new(ALIAS),
            Duration::from_secs(60),
        );
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(async move { scheduler.run(rx).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(tx);
        handle.await.unwrap();

        // One cycle completed before the long sleep was interrupted.
        assert_eq!(store.write_count(), 1);
    }
}
