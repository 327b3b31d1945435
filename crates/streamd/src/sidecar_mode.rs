//! Sidecar mode — the per-replica dataplane process.
//!
//! Configuration comes from the environment the controller stamped into
//! the pod. Shutdown is triggered by SIGTERM/ctrl-c or by the kill
//! command hitting `POST /pre-stop`; either way ingestion stops, in-
//! flight handlers drain, and every driver release runs.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;
use tracing::{info, warn};

use streamgrid_metrics::Registry;
use streamgrid_sidecar::http::{router, HttpState};
use streamgrid_sidecar::{HttpProcessor, Sidecar, SidecarConfig, SidecarOptions};

pub async fn run(port: u16, registry: Registry) -> anyhow::Result<()> {
    let config = SidecarConfig::from_env()?;
    info!(step = %config.spec.name, replica = config.replica, "sidecar starting");

    let sidecar = Sidecar::start(
        config,
        registry.clone(),
        Arc::new(HttpProcessor::default()),
        None,
        SidecarOptions::default(),
    )
    .await?;

    let ready = Arc::new(AtomicBool::new(true));
    let pre_stop = Arc::new(Notify::new());
    let state = HttpState {
        senders: sidecar.http_senders(),
        registry,
        ready: ready.clone(),
        pre_stop: pre_stop.clone(),
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "sidecar listening");

    let shutdown_signal = {
        let pre_stop = pre_stop.clone();
        async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = pre_stop.notified() => {}
            }
        }
    };
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    ready.store(false, Ordering::Release);
    let failures = sidecar.shutdown().await;
    if !failures.is_empty() {
        let names: Vec<&str> = failures.iter().map(|(name, _)| name.as_str()).collect();
        warn!(?names, "driver releases failed");
    }
    info!("sidecar stopped");
    Ok(())
}
