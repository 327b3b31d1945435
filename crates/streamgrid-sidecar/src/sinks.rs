//! Sink wiring: connect declared sinks and fan messages out to them.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::info;

use streamgrid_drivers::{connect_sink, DriverContext, DriverError, SinkDriver};
use streamgrid_metrics::{CounterVec, Registry};
use streamgrid_types::Sink;

use crate::error::SidecarError;
use crate::hooks::StopHooks;
use crate::status::SharedStatus;

struct NamedSink {
    name: String,
    driver: Arc<dyn SinkDriver>,
}

/// Sequential fan-out over the configured sinks, in declaration order.
///
/// Counters are bumped before each delivery attempt; the first failing
/// sink increments its error counter and aborts the fan-out, leaving
/// the source driver to decide between retry and ack.
pub struct SinkFanout {
    sinks: Vec<NamedSink>,
    status: Arc<SharedStatus>,
    counter: Arc<CounterVec>,
    replica: u32,
}

impl std::fmt::Debug for SinkFanout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkFanout").finish_non_exhaustive()
    }
}

impl SinkFanout {
    pub async fn send(&self, msg: &[u8]) -> Result<(), DriverError> {
        let replica_label = self.replica.to_string();
        for sink in &self.sinks {
            self.counter
                .with_label_values(&[&sink.name, &replica_label])
                .inc();
            self.status
                .incr_sink_total(&sink.name, self.replica, msg.len() as u64);
            if let Err(e) = sink.driver.send(msg).await {
                self.status.incr_sink_errors(&sink.name, self.replica);
                return Err(e);
            }
        }
        Ok(())
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }
}

/// Connect every declared sink, registering a stop hook per driver.
/// Duplicate names are rejected before anything starts.
pub async fn connect_sinks(
    ctx: &DriverContext,
    sinks: &[Sink],
    status: Arc<SharedStatus>,
    registry: &Registry,
    hooks: &StopHooks,
) -> Result<SinkFanout, SidecarError> {
    let counter = registry.counter_vec(
        "sinks_total",
        "Total number of messages per sink.",
        &["sinkName", "replica"],
    );
    let mut seen = HashSet::new();
    let mut connected = Vec::with_capacity(sinks.len());
    for sink in sinks {
        if !seen.insert(sink.name.clone()) {
            return Err(SidecarError::DuplicateSink(sink.name.clone()));
        }
        info!(sink = %sink.name, "connecting sink");
        let driver: Arc<dyn SinkDriver> = Arc::from(connect_sink(ctx, sink).await?);
        let release = driver.clone();
        hooks.push(
            &format!("sink/{}", sink.name),
            Box::new(move || {
                Box::pin(async move { release.release().await.map_err(anyhow::Error::new) })
            }),
        );
        connected.push(NamedSink {
            name: sink.name.clone(),
            driver,
        });
    }
    Ok(SinkFanout {
        sinks: connected,
        status,
        counter,
        replica: ctx.replica,
    })
}
