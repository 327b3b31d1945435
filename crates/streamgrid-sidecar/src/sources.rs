//! Source wiring: connect declared sources and start one worker per
//! source, each routing messages through the user code into the sinks.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use streamgrid_drivers::{
    connect_source, DriverContext, MessageHandler, SourceDriver,
};
use streamgrid_metrics::Registry;
use streamgrid_types::Source;

use crate::error::SidecarError;
use crate::hooks::StopHooks;
use crate::processor::UserProcessor;
use crate::sinks::SinkFanout;
use crate::status::SharedStatus;

pub struct ConnectedSource {
    name: String,
    driver: Arc<dyn SourceDriver>,
}

impl std::fmt::Debug for ConnectedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectedSource")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Connect every declared source, registering a stop hook per driver.
pub async fn connect_sources(
    ctx: &DriverContext,
    sources: &[Source],
    hooks: &StopHooks,
) -> Result<Vec<ConnectedSource>, SidecarError> {
    let mut seen = HashSet::new();
    let mut connected = Vec::with_capacity(sources.len());
    for source in sources {
        if !seen.insert(source.name.clone()) {
            return Err(SidecarError::DuplicateSource(source.name.clone()));
        }
        info!(source = %source.name, "connecting source");
        let driver: Arc<dyn SourceDriver> = Arc::from(connect_source(ctx, source).await?);
        let release = driver.clone();
        hooks.push(
            &format!("source/{}", source.name),
            Box::new(move || {
                Box::pin(async move { release.release().await.map_err(anyhow::Error::new) })
            }),
        );
        connected.push(ConnectedSource {
            name: source.name.clone(),
            driver,
        });
    }
    Ok(connected)
}

/// Spawn one worker task per source. Each message is counted, processed
/// by the user code, and fanned out to the sinks before the source is
/// allowed to ack it; handler errors count against the source and are
/// surfaced to the driver, which decides between retry and drop.
pub fn start_sources(
    sources: Vec<ConnectedSource>,
    fanout: Arc<SinkFanout>,
    processor: Arc<dyn UserProcessor>,
    status: Arc<SharedStatus>,
    registry: &Registry,
    replica: u32,
    shutdown: watch::Receiver<bool>,
) -> Vec<JoinHandle<()>> {
    let counter = registry.counter_vec(
        "sources_total",
        "Total number of messages per source.",
        &["sourceName", "replica"],
    );

    sources
        .into_iter()
        .map(|source| {
            let name = source.name;
            let driver = source.driver;
            let counter_cell = counter.with_label_values(&[&name, &replica.to_string()]);
            let handler: MessageHandler = {
                let name = name.clone();
                let fanout = fanout.clone();
                let processor = processor.clone();
                let status = status.clone();
                Arc::new(move |msg: Vec<u8>| {
                    let name = name.clone();
                    let fanout = fanout.clone();
                    let processor = processor.clone();
                    let status = status.clone();
                    let counter_cell = counter_cell.clone();
                    Box::pin(async move {
                        counter_cell.inc();
                        status.incr_source_total(&name, replica, msg.len() as u64);
                        let outcome = async {
                            if let Some(result) = processor.process(&msg).await? {
                                fanout.send(&result).await.map_err(anyhow::Error::new)?;
                            }
                            Ok::<(), anyhow::Error>(())
                        }
                        .await;
                        if let Err(e) = outcome {
                            status.incr_source_errors(&name, replica);
                            return Err(e);
                        }
                        Ok(())
                    })
                })
            };

            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                info!(source = %name, "source started");
                if let Err(e) = driver.run(handler, shutdown).await {
                    error!(source = %name, error = %e, "source stopped with error");
                }
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use streamgrid_drivers::Secrets;
    use streamgrid_types::HttpConfig;

    fn ctx() -> DriverContext {
        DriverContext::new("default", "pl", "map", 0, Secrets::new("/nonexistent"))
    }

    fn http_source(name: &str) -> Source {
        Source {
            name: name.to_string(),
            http: Some(HttpConfig::default()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn duplicate_source_names_are_rejected() {
        let ctx = ctx();
        let (_tx_a, rx_a) = tokio::sync::mpsc::channel(1);
        ctx.register_http_source("in", rx_a);
        let hooks = StopHooks::new();
        let err = connect_sources(&ctx, &[http_source("in"), http_source("in")], &hooks)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "duplicate source named \"in\"");
    }
}
