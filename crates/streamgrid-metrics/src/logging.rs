//! Log wiring: stream splitting and per-level counters.
//!
//! Error records go to stderr, everything else to stdout, so the two
//! streams can be collected separately. Every record is additionally
//! counted into `log_messages_total{level}`.

use std::io;
use std::sync::Arc;

use tracing::{Event, Level, Metadata, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::counters::{CounterVec, Registry};

/// Routes formatted records to stderr when the level is ERROR,
/// otherwise to stdout.
#[derive(Clone, Copy, Default)]
pub struct SplitWriter;

pub enum StreamWriter {
    Stdout(io::Stdout),
    Stderr(io::Stderr),
}

impl StreamWriter {
    fn is_stderr(&self) -> bool {
        matches!(self, StreamWriter::Stderr(_))
    }
}

impl io::Write for StreamWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            StreamWriter::Stdout(w) => w.write(buf),
            StreamWriter::Stderr(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            StreamWriter::Stdout(w) => w.flush(),
            StreamWriter::Stderr(w) => w.flush(),
        }
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for SplitWriter {
    type Writer = StreamWriter;

    fn make_writer(&'a self) -> Self::Writer {
        StreamWriter::Stdout(io::stdout())
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        if errors_to_stderr(meta.level()) {
            StreamWriter::Stderr(io::stderr())
        } else {
            StreamWriter::Stdout(io::stdout())
        }
    }
}

fn errors_to_stderr(level: &Level) -> bool {
    *level == Level::ERROR
}

/// Counts every log record into `log_messages_total{level}`.
pub struct LevelCountLayer {
    counter: Arc<CounterVec>,
}

impl LevelCountLayer {
    pub fn new(registry: &Registry) -> Self {
        Self {
            counter: registry.counter_vec(
                "log_messages_total",
                "Log records by level.",
                &["level"],
            ),
        }
    }
}

impl<S: Subscriber> Layer<S> for LevelCountLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let level = *event.metadata().level();
        let name = if level == Level::ERROR {
            "error"
        } else if level == Level::WARN {
            "warn"
        } else if level == Level::INFO {
            "info"
        } else if level == Level::DEBUG {
            "debug"
        } else {
            "trace"
        };
        self.counter.with_label_values(&[name]).inc();
    }
}

/// Install the global subscriber: env-filtered fmt output through the
/// stream splitter, plus per-level counting into `registry`.
pub fn init_telemetry(registry: &Registry) {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".parse().expect("valid default filter")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(SplitWriter))
        .with(LevelCountLayer::new(registry))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_error_level_routes_to_stderr() {
        assert!(errors_to_stderr(&Level::ERROR));
        assert!(!errors_to_stderr(&Level::WARN));
        assert!(!errors_to_stderr(&Level::INFO));
        assert!(!errors_to_stderr(&Level::DEBUG));
    }

    #[test]
    fn stream_writer_reports_its_stream() {
        assert!(StreamWriter::Stderr(io::stderr()).is_stderr());
        assert!(!StreamWriter::Stdout(io::stdout()).is_stderr());
    }

    #[test]
    fn level_counts_accumulate() {
        let registry = Registry::new();
        let subscriber =
            tracing_subscriber::registry().with(LevelCountLayer::new(&registry));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("one");
            tracing::info!("two");
            tracing::warn!("three");
        });

        let counter = registry.counter_vec("log_messages_total", "", &["level"]);
        assert_eq!(counter.with_label_values(&["info"]).get(), 2);
        assert_eq!(counter.with_label_values(&["warn"]).get(), 1);
        assert_eq!(counter.with_label_values(&["error"]).get(), 0);
    }
}
