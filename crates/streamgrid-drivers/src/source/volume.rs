//! Volume source — consumes files from a mounted directory, removing
//! each file once its content has been processed.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::warn;

use streamgrid_types::VolumeConfig;

use crate::error::DriverResult;
use crate::{MessageHandler, SourceDriver};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

pub struct VolumeSource {
    dir: PathBuf,
    poll_interval: Duration,
}

impl VolumeSource {
    pub fn new(cfg: &VolumeConfig) -> Self {
        Self {
            dir: PathBuf::from(&cfg.path),
            poll_interval: cfg
                .poll_interval_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_POLL_INTERVAL),
        }
    }

    async fn poll_once(&self, handler: &MessageHandler) -> DriverResult<()> {
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let path = entry.path();
            let content = tokio::fs::read(&path).await?;
            match handler(content).await {
                Ok(()) => tokio::fs::remove_file(&path).await?,
                // File stays; the next poll retries it.
                Err(e) => warn!(path = %path.display(), error = %e, "handler failed, file kept"),
            }
        }
        Ok(())
    }
}

#[async_trait]
impl SourceDriver for VolumeSource {
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn consumed_files_are_removed() {
        let dir = std::env::temp_dir().join(format!("sg-volsrc-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("one.msg"), b"one").unwrap();
        std::fs::write(dir.join("two.msg"), b"two").unwrap();

        let source = VolumeSource::new(&VolumeConfig {
            path: dir.to_string_lossy().into_owned(),
            poll_interval_secs: Some(1),
        });

        let seen = Arc::new(Mutex::new(Vec::new()));
        let handler: MessageHandler = {
            let seen = seen.clone();
            Arc::new(move |msg| {
                let seen = seen.clone();
                Box::pin(async move {
                    seen.lock().unwrap().push(msg);
                    Ok(())
                })
            })
        };

        source.poll_once(&handler).await.unwrap();

        let mut collected = seen.lock().unwrap().clone();
        collected.sort();
        assert_eq!(collected, vec![b"one".to_vec(), b"two".to_vec()]);
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 0);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn failed_files_are_kept_for_retry() {
        let dir = std::env::temp_dir().join(format!("sg-volsrc-err-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("one.msg"), b"one").unwrap();

        let source = VolumeSource::new(&VolumeConfig {
            path: dir.to_string_lossy().into_owned(),
            poll_interval_secs: Some(1),
        });

        let handler: MessageHandler =
            Arc::new(|_msg| Box::pin(async { anyhow::bail!("downstream unavailable") }));
        source.poll_once(&handler).await.unwrap();
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 1);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
