//! HTTP sink — POSTs each message to a configured endpoint.

use async_trait::async_trait;

use streamgrid_types::HttpConfig;

use crate::error::{DriverError, DriverResult};
use crate::{DriverContext, SinkDriver};

pub struct HttpSink {
    client: reqwest::Client,
    url: String,
    bearer: Option<String>,
}

impl HttpSink {
    pub fn connect(ctx: &DriverContext, cfg: &HttpConfig) -> DriverResult<Self> {
        let url = cfg
            .url
            .clone()
            .ok_or_else(|| DriverError::Config("http sink requires a url".to_string()))?;
        let mut builder = reqwest::Client::builder();
        if cfg.insecure_skip_verify {
            builder = builder.danger_accept_invalid_certs(true);
        }
        let client = builder
            .build()
            .map_err(|e| DriverError::Connect(e.to_string()))?;
        let bearer = cfg
            .bearer_token
            .as_ref()
            .map(|secret| ctx.secrets.resolve(secret))
            .transpose()?;
        Ok(Self {
            client,
            url,
            bearer,
        })
    }
}

#[async_trait]
impl SinkDriver for HttpSink {
    async fn send(&self, msg: &[u8]) -> DriverResult<()> {
        let mut req = self.client.post(&self.url).body(msg.to_vec());
        if let Some(token) = &self.bearer {
            req = req.bearer_auth(token);
        }
        let resp = req
            .send()
            .await
            .map_err(|e| DriverError::Send(e.to_string()))?;
        resp.error_for_status()
            .map_err(|e| DriverError::Send(e.to_string()))?;
        Ok(())
    }
}
