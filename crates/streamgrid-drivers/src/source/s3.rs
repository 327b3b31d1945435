//! S3 source — polls a bucket prefix, emits object bodies, and deletes
//! objects once the handler has processed them.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::warn;

use streamgrid_types::S3Config;

use crate::error::{DriverError, DriverResult};
use crate::sink::s3::make_client;
use crate::{DriverContext, MessageHandler, SourceDriver};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

pub struct S3Source {
    client: aws_sdk_s3::Client,
    bucket: String,
    prefix: Option<String>,
    poll_interval: Duration,
}

impl S3Source {
    pub async fn connect(ctx: &DriverContext, cfg: &S3Config) -> DriverResult<Self> {
        Ok(Self {
            client: make_client(ctx, cfg).await?,
            bucket: cfg.bucket.clone(),
            prefix: cfg.prefix.clone(),
            poll_interval: cfg
                .poll_interval_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_POLL_INTERVAL),
        })
    }

    async fn poll_once(&self, handler: &MessageHandler) -> DriverResult<()> {
        let page = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .set_prefix(self.prefix.clone())
            .send()
            .await
            .map_err(|e| DriverError::Recv(e.to_string()))?;
        for object in page.contents() {
            let Some(key) = object.key() else { continue };
            let body = self
                .client
                .get_object()
                .bucket(&self.bucket)
                .key(key)
                .send()
                .await
                .map_err(|e| DriverError::Recv(e.to_string()))?
                .body
                .collect()
                .await
                .map_err(|e| DriverError::Recv(e.to_string()))?
                .into_bytes()
                .to_vec();
            match handler(body).await {
                Ok(()) => {
                    self.client
                        .delete_object()
                        .bucket(&self.bucket)
                        .key(key)
                        .send()
                        .await
                        .map_err(|e| DriverError::Recv(e.to_string()))?;
                }
                // Object stays; the next poll retries it.
                Err(e) => warn!(key, error = %e, "handler failed, object kept"),
            }
        }
        Ok(())
    }
}

#[async_trait]
impl SourceDriver for S3Source {
    async fn run(
        &self,
        handler: MessageHandler,
        mut shutdown: watch::Receiver<bool>,
    ) -> DriverResult<()> {
        loop {
            self.poll_once(&handler).await?;
            tokio::select! {
                _ = shutdown.changed() => return Ok(()),
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }
}
