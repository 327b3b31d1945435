//! S3 sink — writes each message as an object keyed by its digest.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use sha2::{Digest, Sha256};

use streamgrid_types::S3Config;

use crate::error::{DriverError, DriverResult};
use crate::{DriverContext, SinkDriver};

pub(crate) async fn make_client(
    ctx: &DriverContext,
    cfg: &S3Config,
) -> DriverResult<aws_sdk_s3::Client> {
    let region = aws_sdk_s3::config::Region::new(
        cfg.region.clone().unwrap_or_else(|| "us-east-1".to_string()),
    );
    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest()).region(region);
    if let Some(endpoint) = &cfg.endpoint {
        loader = loader.endpoint_url(endpoint);
    }
    if let Some(creds) = &cfg.credentials {
        let access_key = ctx.secrets.resolve(&creds.access_key)?;
        let secret_key = ctx.secrets.resolve(&creds.secret_key)?;
        loader = loader.credentials_provider(aws_sdk_s3::config::Credentials::new(
            access_key, secret_key, None, None, "streamgrid",
        ));
    }
    let shared = loader.load().await;
    Ok(aws_sdk_s3::Client::new(&shared))
}

pub struct S3Sink {
    client: aws_sdk_s3::Client,
    bucket: String,
    prefix: String,
}

impl S3Sink {
    pub async fn connect(ctx: &DriverContext, cfg: &S3Config) -> DriverResult<Self> {
        Ok(Self {
            client: make_client(ctx, cfg).await?,
            bucket: cfg.bucket.clone(),
            prefix: cfg.prefix.clone().unwrap_or_default(),
        })
    }
}

#[async_trait]
impl SinkDriver for S3Sink {
    async fn send(&self, msg: &[u8]) -> DriverResult<()> {
        let key = format!("{}{}", self.prefix, hex::encode(Sha256::digest(msg)));
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(msg.to_vec()))
            .send()
            .await
            .map_err(|e| DriverError::Send(e.to_string()))?;
        Ok(())
    }
}
