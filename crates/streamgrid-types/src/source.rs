//! Source records — where a step ingests messages from.

use serde::{Deserialize, Serialize};

use crate::error::InvalidStep;
use crate::transport::*;

/// A named source with exactly one transport variant populated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stan: Option<StanConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kafka: Option<KafkaConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<HttpConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3: Option<S3Config>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db: Option<DbConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log: Option<LogConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<VolumeConfig>,
}

impl Source {
    pub fn populated(&self) -> usize {
        [
            self.stan.is_some(),
            self.kafka.is_some(),
            self.http.is_some(),
            self.s3.is_some(),
            self.db.is_some(),
            self.log.is_some(),
            self.volume.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count()
    }

    pub fn validate(&self) -> Result<(), InvalidStep> {
        if self.populated() != 1 {
            return Err(InvalidStep::MisconfiguredSource(self.name.clone()));
        }
        Ok(())
    }
}
