//! User-code invocation.
//!
//! The sidecar hands every source message to the main container and
//! forwards whatever comes back to the sinks. The transport is local
//! HTTP: the user container listens on the pod's loopback interface.

use async_trait::async_trait;

/// Invokes the user code with one message.
#[async_trait]
pub trait UserProcessor: Send + Sync + 'static {
    /// Process a message. `None` means the user code produced no output
    /// for this message, so nothing is sent to the sinks.
    async fn process(&self, msg: &[u8]) -> anyhow::Result<Option<Vec<u8>>>;
}

/// Default in-pod HTTP address of the user container.
pub const DEFAULT_PROCESS_URL: &str = "http://127.0.0.1:8080/messages";

/// POSTs messages to the main container over loopback HTTP. A 204
/// response means "no output"; any other 2xx body is the result.
pub struct HttpProcessor {
    client: reqwest::Client,
    url: String,
}

impl HttpProcessor {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

impl Default for HttpProcessor {
    fn default() -> Self {
        Self::new(DEFAULT_PROCESS_URL)
    }
}

#[async_trait]
impl UserProcessor for HttpProcessor {
    async fn process(&self, msg: &[u8]) -> anyhow::Result<Option<Vec<u8>>> {
        let resp = self
            .client
            .post(&self.url)
            .body(msg.to_vec())
            .send()
            .await?;
        if resp.status() == reqwest::StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let body = resp.error_for_status()?.bytes().await?;
        Ok(Some(body.to_vec()))
    }
}
