//! Kafka sink — produces one record per message.

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;

use streamgrid_types::KafkaConfig;

use crate::error::{DriverError, DriverResult};
use crate::SinkDriver;

pub struct KafkaSink {
    producer: FutureProducer,
    topic: String,
}

impl KafkaSink {
    pub fn connect(cfg: &KafkaConfig) -> DriverResult<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", cfg.brokers.join(","))
            .set("message.timeout.ms", "30000")
            .create()
            .map_err(|e| DriverError::Connect(e.to_string()))?;
        Ok(Self {
            producer,
            topic: cfg.topic.clone(),
        })
    }
}

#[async_trait]
impl SinkDriver for KafkaSink {
    async fn send(&self, msg: &[u8]) -> DriverResult<()> {
        let record = FutureRecord::<str, [u8]>::to(&self.topic).payload(msg);
        self.producer
            .send(record, Timeout::Never)
            .await
            .map_err(|(e, _)| DriverError::Send(e.to_string()))?;
        Ok(())
    }

    async fn release(&self) -> DriverResult<()> {
        self.producer
            .flush(Timeout::Never)
            .map_err(|e| DriverError::Release(e.to_string()))
    }
}
