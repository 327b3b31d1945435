//! streamgrid-metrics — counter vectors and log telemetry.
//!
//! A [`Registry`] holds labeled counter vectors (`sinks_total`,
//! `sources_total`, `log_messages_total`, …) backed by atomics. The
//! registry renders into the Prometheus text exposition format for
//! scraping, and the logging module wires `tracing` so that error
//! records go to stderr, everything else to stdout, and every record is
//! counted by level.

pub mod counters;
pub mod logging;
pub mod prometheus;

pub use counters::{CounterHandle, CounterVec, Registry};
pub use logging::init_telemetry;
pub use prometheus::render_prometheus;
