//! streamgrid-drivers — uniform connect/send/run/release over the
//! concrete transports a step can declare.
//!
//! The [`Sink`]/[`Source`] records are tagged variants; [`connect_sink`]
//! and [`connect_source`] dispatch on the populated field and hand back
//! a boxed driver. Adding a transport is adding a variant and a match
//! arm here — the sidecar runtime itself does not change.

pub mod error;
pub mod secrets;
pub mod sink;
pub mod source;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::future::BoxFuture;
use tokio::sync::{mpsc, watch};

use streamgrid_types::{Sink, Source};

pub use error::{DriverError, DriverResult};
pub use secrets::Secrets;

/// Callback a source pumps messages into. The source decides per its
/// own semantics whether a handler error means retry or drop.
pub type MessageHandler =
    Arc<dyn Fn(Vec<u8>) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// A connected sink.
#[async_trait]
pub trait SinkDriver: Send + Sync {
    /// Deliver one message.
    async fn send(&self, msg: &[u8]) -> DriverResult<()>;

    /// Release held resources. Invoked exactly once on shutdown.
    async fn release(&self) -> DriverResult<()> {
        Ok(())
    }
}

/// A connected source.
#[async_trait]
pub trait SourceDriver: Send + Sync {
    /// Pump messages into `handler` until the shutdown channel fires.
    async fn run(
        &self,
        handler: MessageHandler,
        shutdown: watch::Receiver<bool>,
    ) -> DriverResult<()>;

    /// Release held resources. Invoked exactly once on shutdown.
    async fn release(&self) -> DriverResult<()> {
        Ok(())
    }
}

/// Shared context drivers connect with: identity for group/queue names,
/// the secret resolver, and the channels backing HTTP sources.
pub struct DriverContext {
    pub namespace: String,
    pub pipeline_name: String,
    pub step_name: String,
    pub replica: u32,
    pub secrets: Secrets,
    http_sources: Mutex<HashMap<String, mpsc::Receiver<Vec<u8>>>>,
}

impl DriverContext {
    pub fn new(
        namespace: impl Into<String>,
        pipeline_name: impl Into<String>,
        step_name: impl Into<String>,
        replica: u32,
        secrets: Secrets,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            pipeline_name: pipeline_name.into(),
            step_name: step_name.into(),
            replica,
            secrets,
            http_sources: Mutex::new(HashMap::new()),
        }
    }

    /// Register the channel feeding an HTTP source. The sidecar's HTTP
    /// endpoint owns the sender; the driver takes the receiver when it
    /// connects.
    pub fn register_http_source(&self, name: &str, rx: mpsc::Receiver<Vec<u8>>) {
        self.http_sources
            .lock()
            .expect("http sources lock")
            .insert(name.to_string(), rx);
    }

    fn take_http_source(&self, name: &str) -> Option<mpsc::Receiver<Vec<u8>>> {
        self.http_sources
            .lock()
            .expect("http sources lock")
            .remove(name)
    }

    /// Default consumer-group / queue name for brokered sources.
    fn group_name(&self) -> String {
        format!("{}-{}", self.pipeline_name, self.step_name)
    }
}

/// Connect the driver for a sink record, dispatching on its variant.
pub async fn connect_sink(
    ctx: &DriverContext,
    sink: &Sink,
) -> DriverResult<Box<dyn SinkDriver>> {
    sink.validate()
        .map_err(|e| DriverError::Config(e.to_string()))?;
    if let Some(cfg) = &sink.stan {
        Ok(Box::new(sink::stan::StanSink::connect(cfg).await?))
    } else if let Some(cfg) = &sink.kafka {
        Ok(Box::new(sink::kafka::KafkaSink::connect(cfg)?))
    } else if let Some(cfg) = &sink.http {
        Ok(Box::new(sink::http::HttpSink::connect(ctx, cfg)?))
    } else if let Some(cfg) = &sink.s3 {
        Ok(Box::new(sink::s3::S3Sink::connect(ctx, cfg).await?))
    } else if let Some(cfg) = &sink.db {
        Ok(Box::new(sink::db::DbSink::connect(ctx, cfg).await?))
    } else if let Some(cfg) = &sink.log {
        Ok(Box::new(sink::log::LogSink::new(&sink.name, cfg)))
    } else if let Some(cfg) = &sink.volume {
        Ok(Box::new(sink::volume::VolumeSink::connect(cfg).await?))
    } else {
        Err(DriverError::Config(format!(
            "sink {:?} misconfigured",
            sink.name
        )))
    }
}

/// Connect the driver for a source record, dispatching on its variant.
pub async fn connect_source(
    ctx: &DriverContext,
    source: &Source,
) -> DriverResult<Box<dyn SourceDriver>> {
    source
        .validate()
        .map_err(|e| DriverError::Config(e.to_string()))?;
    if let Some(cfg) = &source.stan {
        Ok(Box::new(source::stan::StanSource::connect(ctx, cfg).await?))
    } else if let Some(cfg) = &source.kafka {
        Ok(Box::new(source::kafka::KafkaSource::connect(ctx, cfg)?))
    } else if source.http.is_some() {
        let rx = ctx.take_http_source(&source.name).ok_or_else(|| {
            DriverError::Config(format!(
                "http source {:?} has no registered endpoint channel",
                source.name
            ))
        })?;
        Ok(Box::new(source::http::HttpSource::new(rx)))
    } else if let Some(cfg) = &source.s3 {
        Ok(Box::new(source::s3::S3Source::connect(ctx, cfg).await?))
    } else if let Some(cfg) = &source.db {
        Ok(Box::new(source::db::DbSource::connect(ctx, cfg).await?))
    } else if let Some(cfg) = &source.log {
        Ok(Box::new(source::log::LogSource::new(cfg)?))
    } else if let Some(cfg) = &source.volume {
        Ok(Box::new(source::volume::VolumeSource::new(cfg)))
    } else {
        Err(DriverError::Config(format!(
            "source {:?} misconfigured",
            source.name
        )))
    }
}
