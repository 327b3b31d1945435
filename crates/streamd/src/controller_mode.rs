//! Controller mode — reconciler, watch pump, and REST API in one
//! process over the single-node scheduler.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use streamgrid_controller::{AnnotationKiller, ControllerRunner, StepReconciler};
use streamgrid_metrics::Registry;
use streamgrid_scheduler::{LocalScheduler, ObjectStore, WorkQueue};

use crate::api;

pub async fn run(
    api_port: u16,
    data_dir: Option<PathBuf>,
    registry: Registry,
) -> anyhow::Result<()> {
    let store = match &data_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            ObjectStore::open(&dir.join("streamgrid.redb"))?
        }
        None => ObjectStore::open_in_memory()?,
    };
    let scheduler = Arc::new(LocalScheduler::new(store));
    let queue = Arc::new(WorkQueue::new());

    // Watch pump: every step/pod mutation enqueues the step key.
    let mut watch_rx = scheduler.watch();
    {
        let queue = queue.clone();
        tokio::spawn(async move {
            while let Some(key) = watch_rx.recv().await {
                queue.add(key);
            }
        });
    }

    // Steps persisted from a previous run get a pass at startup; the
    // requeue timer keeps them live from then on.
    for step in scheduler.list_steps()? {
        queue.add(step.key());
    }

    let killer = Arc::new(AnnotationKiller::new(scheduler.clone()));
    let reconciler = Arc::new(StepReconciler::new(scheduler.clone(), killer));
    let runner = ControllerRunner::new(queue.clone(), reconciler);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let runner_handle = tokio::spawn(async move { runner.run(shutdown_rx).await });

    let app = api::router(api::ApiState {
        scheduler: scheduler.clone(),
        registry,
    });
    let addr = SocketAddr::from(([0, 0, 0, 0], api_port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "controller API listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    let _ = shutdown_tx.send(true);
    runner_handle.await?;
    info!("controller stopped");
    Ok(())
}
