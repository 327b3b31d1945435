//! Log sink — writes each message to the structured log.

use async_trait::async_trait;
use tracing::info;

use streamgrid_types::LogConfig;

use crate::error::DriverResult;
use crate::SinkDriver;

pub struct LogSink {
    name: String,
    truncate: Option<usize>,
}

impl LogSink {
    pub fn new(name: &str, cfg: &LogConfig) -> Self {
        Self {
            name: name.to_string(),
            truncate: cfg.truncate,
        }
    }
}

#[async_trait]
impl SinkDriver for LogSink {
    async fn send(&self, msg: &[u8]) -> DriverResult<()> {
        let mut text = String::from_utf8_lossy(msg).into_owned();
        if let Some(limit) = self.truncate {
            if text.len() > limit {
                let mut end = limit;
                while !text.is_char_boundary(end) {
                    end -= 1;
                }
                text.truncate(end);
            }
        }
        info!(sink = %self.name, msg = %text, "message");
        Ok(())
    }
}
