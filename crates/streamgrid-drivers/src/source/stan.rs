//! NATS source — subscribes to a subject, optionally through a queue
//! group so replicas share the stream.

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::{watch, Mutex};
use tracing::warn;

use streamgrid_types::StanConfig;

use crate::error::{DriverError, DriverResult};
use crate::{DriverContext, MessageHandler, SourceDriver};

pub struct StanSource {
    client: async_nats::Client,
    subscriber: Mutex<async_nats::Subscriber>,
}

impl StanSource {
    pub async fn connect(ctx: &DriverContext, cfg: &StanConfig) -> DriverResult<Self> {
        let client = async_nats::connect(&cfg.url)
            .await
            .map_err(|e| DriverError::Connect(e.to_string()))?;
        let queue = cfg.queue.clone().unwrap_or_else(|| ctx.group_name());
        let subscriber = client
            .queue_subscribe(cfg.subject.clone(), queue)
            .await
            .map_err(|e| DriverError::Connect(e.to_string()))?;
        Ok(Self {
            client,
            subscriber: Mutex::new(subscriber),
        })
    }
}

#[async_trait]
impl SourceDriver for StanSource {
    async fn run(
        &self,
        handler: MessageHandler,
        mut shutdown: watch::Receiver<bool>,
    ) -> DriverResult<()> {
        let mut subscriber = self.subscriber.lock().await;
        loop {
            tokio::select! {
                _ = shutdown.changed() => return Ok(()),
                next = subscriber.next() => {
                    let Some(msg) = next else { return Ok(()) };
                    if let Err(e) = handler(msg.payload.to_vec()).await {
                        warn!(error = %e, "handler failed, message dropped");
                    }
                }
            }
        }
    }

    async fn release(&self) -> DriverResult<()> {
        self.client
            .flush()
            .await
            .map_err(|e| DriverError::Release(e.to_string()))
    }
}
