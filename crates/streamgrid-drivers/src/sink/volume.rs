//! Volume sink — writes each message as a file in a mounted directory.

use std::path::PathBuf;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use streamgrid_types::VolumeConfig;

use crate::error::DriverResult;
use crate::SinkDriver;

pub struct VolumeSink {
    dir: PathBuf,
}

impl VolumeSink {
    pub async fn connect(cfg: &VolumeConfig) -> DriverResult<Self> {
        let dir = PathBuf::from(&cfg.path);
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }
}

#[async_trait]
impl SinkDriver for VolumeSink {
    async fn send(&self, msg: &[u8]) -> DriverResult<()> {
        let name = format!("{}.msg", hex::encode(Sha256::digest(msg)));
        tokio::fs::write(self.dir.join(name), msg).await?;
        Ok(())
    }
}
