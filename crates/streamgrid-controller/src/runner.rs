//! Controller runner — drains the work queue and runs reconcile passes.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::watch;
use tracing::{error, info};

use streamgrid_scheduler::WorkQueue;

use crate::reconciler::Reconcile;

/// Runs reconcile passes one key at a time.
///
/// The queue guarantees at most one in-flight pass per key; errors and
/// panics are converted into delayed retries so the loop never dies.
pub struct ControllerRunner {
    queue: Arc<WorkQueue>,
    reconciler: Arc<dyn Reconcile>,
    retry_delay: Duration,
}

impl ControllerRunner {
    pub fn new(queue: Arc<WorkQueue>, reconciler: Arc<dyn Reconcile>) -> Self {
        Self {
            queue,
            reconciler,
            retry_delay: Duration::from_secs(5),
        }
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Process keys until the shutdown channel fires.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!("controller started");
        loop {
            tokio::select! {
                key = self.queue.next() => {
                    let pass = AssertUnwindSafe(self.reconciler.reconcile(&key))
                        .catch_unwind()
                        .await;
                    match pass {
                        Err(_) => {
                            error!(step = %key, "reconcile panicked, retrying");
                            self.queue.clone().add_after(key.clone(), self.retry_delay);
                        }
                        Ok(Err(e)) => {
                            error!(step = %key, error = %e, "reconcile failed, retrying");
                            self.queue.clone().add_after(key.clone(), self.retry_delay);
                        }
                        Ok(Ok(Some(after))) => {
                            self.queue.clone().add_after(key.clone(), after);
                        }
                        Ok(Ok(None)) => {}
                    }
                    self.queue.done(&key);
                }
                _ = shutdown.changed() => {
                    info!("controller shutting down");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use streamgrid_types::StepKey;

    use crate::error::ReconcileError;

    struct FlakyReconciler {
        calls: AtomicU32,
    }

    #[async_trait]
    impl Reconcile for FlakyReconciler {
        async fn reconcile(
            &self,
            _key: &StepKey,
        ) -> Result<Option<Duration>, ReconcileError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            match call {
                0 => panic!("induced panic"),
                1 => Err(ReconcileError::PatchStatus(
                    streamgrid_scheduler::SchedulerError::Store("boom".to_string()),
                )),
                _ => Ok(None),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn panics_and_errors_are_retried() {
        let queue = Arc::new(WorkQueue::new());
        let reconciler = Arc::new(FlakyReconciler {
            calls: AtomicU32::new(0),
        });
        let runner = ControllerRunner::new(queue.clone(), reconciler.clone())
            .with_retry_delay(Duration::from_millis(10));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        queue.add(StepKey::new("default", "map"));

        let handle = tokio::spawn(async move { runner.run(shutdown_rx).await });

        // Panic retry, error retry, then success.
        while reconciler.calls.load(Ordering::SeqCst) < 3 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
        assert_eq!(reconciler.calls.load(Ordering::SeqCst), 3);
    }
}
