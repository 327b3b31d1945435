//! Status reporter — periodically patches the sidecar-owned counter
//! maps into the step's status.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, warn};

use streamgrid_scheduler::SchedulerClient;
use streamgrid_types::StepKey;

use crate::status::SharedStatus;

/// Patch counters while they change, with a final flush on shutdown.
pub async fn run_reporter(
    scheduler: Arc<dyn SchedulerClient>,
    key: StepKey,
    status: Arc<SharedStatus>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {
                if let Some((sources, sinks)) = status.snapshot_if_dirty() {
                    match scheduler.patch_step_counters(&key, &sources, &sinks).await {
                        Ok(()) => debug!(step = %key, "counters patched"),
                        Err(e) => {
                            warn!(step = %key, error = %e, "failed to patch counters");
                            // Keep the snapshot pending for the next tick.
                            status.mark_dirty();
                        }
                    }
                }
            }
            _ = shutdown.changed() => {
                if let Some((sources, sinks)) = status.snapshot_if_dirty() {
                    if let Err(e) = scheduler.patch_step_counters(&key, &sources, &sinks).await {
                        warn!(step = %key, error = %e, "final counter patch failed");
                    }
                }
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use streamgrid_scheduler::LocalScheduler;
    use streamgrid_types::{ObjectMeta, Step, StepSpec};

    fn applied_step(scheduler: &LocalScheduler) -> StepKey {
        let step = Step {
            metadata: ObjectMeta {
                namespace: "default".to_string(),
                name: "map".to_string(),
                ..Default::default()
            },
            spec: StepSpec {
                name: "map".to_string(),
                ..Default::default()
            },
            status: None,
        };
        scheduler.apply_step(step).unwrap().key()
    }

    #[tokio::test(start_paused = true)]
    async fn reporter_patches_dirty_counters_and_flushes_on_shutdown() {
        let scheduler = Arc::new(LocalScheduler::open_in_memory().unwrap());
        let key = applied_step(&scheduler);
        let status = Arc::new(SharedStatus::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        status.incr_sink_total("out", 0, 5);

        let handle = tokio::spawn(run_reporter(
            scheduler.clone(),
            key.clone(),
            status.clone(),
            Duration::from_secs(1),
            shutdown_rx,
        ));

        tokio::time::sleep(Duration::from_secs(2)).await;
        let stored = scheduler.get_step(&key).await.unwrap().unwrap();
        assert_eq!(
            stored.status.unwrap().sink_statuses.get("out", 0).total_bytes,
            5
        );

        // Counts accumulated after the last tick survive via the final
        // flush.
        status.incr_sink_total("out", 0, 7);
        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();

        let stored = scheduler.get_step(&key).await.unwrap().unwrap();
        assert_eq!(
            stored.status.unwrap().sink_statuses.get("out", 0).total_bytes,
            12
        );
    }
}
