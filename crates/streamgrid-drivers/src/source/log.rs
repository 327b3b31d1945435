//! Log source — tails a file, emitting one message per line.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::warn;

use streamgrid_types::LogConfig;

use crate::error::{DriverError, DriverResult};
use crate::{MessageHandler, SourceDriver};

const IDLE_WAIT: Duration = Duration::from_secs(1);

pub struct LogSource {
    path: PathBuf,
}

impl LogSource {
    pub fn new(cfg: &LogConfig) -> DriverResult<Self> {
        let path = cfg
            .path
            .clone()
            .ok_or_else(|| DriverError::Config("log source requires a path".to_string()))?;
        Ok(Self {
            path: PathBuf::from(path),
        })
    }
}

#[async_trait]
impl SourceDriver for LogSource {
    async fn run(
        &self,
        handler: MessageHandler,
        mut shutdown: watch::Receiver<bool>,
    ) -> DriverResult<()> {
        let file = tokio::fs::File::open(&self.path).await?;
        let mut lines = BufReader::new(file).lines();
        loop {
            tokio::select! {
                _ = shutdown.changed() => return Ok(()),
                line = lines.next_line() => {
                    match line? {
                        Some(line) => {
                            if let Err(e) = handler(line.into_bytes()).await {
                                warn!(error = %e, "handler failed, line dropped");
                            }
                        }
                        // At EOF; wait for the file to grow.
                        None => tokio::select! {
                            _ = shutdown.changed() => return Ok(()),
                            _ = tokio::time::sleep(IDLE_WAIT) => {}
                        },
                    }
                }
            }
        }
    }
}
