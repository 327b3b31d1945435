//! Kafka source — consumes a topic, committing offsets only after the
//! handler has fully processed a message (at-least-once).

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::Message;
use tokio::sync::watch;
use tracing::warn;

use streamgrid_types::KafkaConfig;

use crate::error::{DriverError, DriverResult};
use crate::{DriverContext, MessageHandler, SourceDriver};

pub struct KafkaSource {
    consumer: StreamConsumer,
}

impl KafkaSource {
    pub fn connect(ctx: &DriverContext, cfg: &KafkaConfig) -> DriverResult<Self> {
        let group_id = cfg.group_id.clone().unwrap_or_else(|| ctx.group_name());
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", cfg.brokers.join(","))
            .set("group.id", group_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .create()
            .map_err(|e| DriverError::Connect(e.to_string()))?;
        consumer
            .subscribe(&[cfg.topic.as_str()])
            .map_err(|e| DriverError::Connect(e.to_string()))?;
        Ok(Self { consumer })
    }
}

#[async_trait]
impl SourceDriver for KafkaSource {
    async fn run(
        &self,
        handler: MessageHandler,
        mut shutdown: watch::Receiver<bool>,
    ) -> DriverResult<()> {
        loop {
            tokio::select! {
                _ = shutdown.changed() => return Ok(()),
                received = self.consumer.recv() => {
                    let msg = received.map_err(|e| DriverError::Recv(e.to_string()))?;
                    let payload = msg.payload().unwrap_or_default().to_vec();
                    match handler(payload).await {
                        Ok(()) => {
                            self.consumer
                                .commit_message(&msg, CommitMode::Async)
                                .map_err(|e| DriverError::Recv(e.to_string()))?;
                        }
                        // Uncommitted: the broker redelivers.
                        Err(e) => warn!(error = %e, "handler failed, not committing"),
                    }
                }
            }
        }
    }
}
