//! Sidecar runtime — wires drivers, workers, and the status reporter
//! into one lifecycle.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use streamgrid_drivers::{DriverContext, Secrets};
use streamgrid_metrics::Registry;
use streamgrid_scheduler::SchedulerClient;

use crate::config::SidecarConfig;
use crate::error::SidecarError;
use crate::hooks::StopHooks;
use crate::processor::UserProcessor;
use crate::reporter::run_reporter;
use crate::sinks::{connect_sinks, SinkFanout};
use crate::sources::{connect_sources, start_sources};
use crate::status::SharedStatus;

#[derive(Debug, Clone, Copy)]
pub struct SidecarOptions {
    /// Interval between counter patches to the step status.
    pub report_interval: Duration,
    /// Bound on draining in-flight handlers at shutdown.
    pub drain_timeout: Duration,
}

impl Default for SidecarOptions {
    fn default() -> Self {
        Self {
            report_interval: Duration::from_secs(5),
            drain_timeout: Duration::from_secs(30),
        }
    }
}

/// A running dataplane for one replica.
pub struct Sidecar {
    fanout: Arc<SinkFanout>,
    status: Arc<SharedStatus>,
    hooks: Arc<StopHooks>,
    shutdown_tx: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
    http_senders: Arc<HashMap<String, mpsc::Sender<Vec<u8>>>>,
    drain_timeout: Duration,
}

impl std::fmt::Debug for Sidecar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sidecar").finish_non_exhaustive()
    }
}

impl Sidecar {
    /// Validate the spec, connect all drivers, and start the message
    /// loop. Configuration errors (duplicate names, misconfigured
    /// variants) fail here, before anything runs.
    pub async fn start(
        config: SidecarConfig,
        registry: Registry,
        processor: Arc<dyn UserProcessor>,
        scheduler: Option<Arc<dyn SchedulerClient>>,
        options: SidecarOptions,
    ) -> Result<Self, SidecarError> {
        config.spec.validate()?;
        info!(
            step = %config.spec.name,
            replica = config.replica,
            sources = config.spec.sources.len(),
            sinks = config.spec.sinks.len(),
            "starting sidecar"
        );

        let status = Arc::new(SharedStatus::new());
        let hooks = Arc::new(StopHooks::new());
        let ctx = DriverContext::new(
            &config.namespace,
            &config.pipeline_name,
            &config.spec.name,
            config.replica,
            Secrets::mounted(),
        );

        // HTTP sources are fed by the sidecar's own endpoint; wire one
        // channel per declared http source before drivers connect.
        let mut http_senders = HashMap::new();
        for source in config.spec.sources.iter().filter(|s| s.http.is_some()) {
            let (tx, rx) = mpsc::channel(64);
            ctx.register_http_source(&source.name, rx);
            http_senders.insert(source.name.clone(), tx);
        }

        let fanout = Arc::new(
            connect_sinks(&ctx, &config.spec.sinks, status.clone(), &registry, &hooks).await?,
        );
        let connected_sources = connect_sources(&ctx, &config.spec.sources, &hooks).await?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut handles = start_sources(
            connected_sources,
            fanout.clone(),
            processor,
            status.clone(),
            &registry,
            config.replica,
            shutdown_rx.clone(),
        );

        if let Some(scheduler) = scheduler {
            handles.push(tokio::spawn(run_reporter(
                scheduler,
                config.step_key(),
                status.clone(),
                options.report_interval,
                shutdown_rx,
            )));
        }

        Ok(Self {
            fanout,
            status,
            hooks,
            shutdown_tx,
            handles,
            http_senders: Arc::new(http_senders),
            drain_timeout: options.drain_timeout,
        })
    }

    /// The sink fan-out, for callers that inject messages directly.
    pub fn fanout(&self) -> Arc<SinkFanout> {
        self.fanout.clone()
    }

    /// Shared counters, for observability surfaces.
    pub fn status(&self) -> Arc<SharedStatus> {
        self.status.clone()
    }

    /// Senders feeding the declared HTTP sources, keyed by source name.
    pub fn http_senders(&self) -> Arc<HashMap<String, mpsc::Sender<Vec<u8>>>> {
        self.http_senders.clone()
    }

    /// Stop ingestion, drain in-flight handlers up to the configured
    /// deadline, then run every stop hook in reverse order. Returns the
    /// release failures.
    pub async fn shutdown(self) -> Vec<(String, anyhow::Error)> {
        info!("sidecar shutting down");
        let _ = self.shutdown_tx.send(true);

        let drained =
            tokio::time::timeout(self.drain_timeout, futures::future::join_all(self.handles))
                .await;
        if drained.is_err() {
            warn!("drain deadline exceeded, releasing drivers anyway");
        }

        self.hooks.run_all().await
    }
}
