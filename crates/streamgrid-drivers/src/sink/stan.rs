//! NATS sink — publishes each message to a subject.

use async_trait::async_trait;
use bytes::Bytes;

use streamgrid_types::StanConfig;

use crate::error::{DriverError, DriverResult};
use crate::SinkDriver;

pub struct StanSink {
    client: async_nats::Client,
    subject: String,
}

impl StanSink {
    pub async fn connect(cfg: &StanConfig) -> DriverResult<Self> {
        let client = async_nats::connect(&cfg.url)
            .await
            .map_err(|e| DriverError::Connect(e.to_string()))?;
        Ok(Self {
            client,
            subject: cfg.subject.clone(),
        })
    }
}

#[async_trait]
impl SinkDriver for StanSink {
    async fn send(&self, msg: &[u8]) -> DriverResult<()> {
        self.client
            .publish(self.subject.clone(), Bytes::copy_from_slice(msg))
            .await
            .map_err(|e| DriverError::Send(e.to_string()))
    }

    async fn release(&self) -> DriverResult<()> {
        self.client
            .flush()
            .await
            .map_err(|e| DriverError::Release(e.to_string()))
    }
}
