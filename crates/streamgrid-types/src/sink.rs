//! Sink records — where a step forwards processed messages.

use serde::{Deserialize, Serialize};

use crate::error::InvalidStep;
use crate::transport::*;

/// A named sink with exactly one transport variant populated.
///
/// The name is the primary key for counter maps and duplicate detection
/// within a step's sink list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sink {
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

impl Sink {
    /// Count of populated transport variants.
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
            return Err(InvalidStep::MisconfiguredSink(self.name.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_variant_is_valid() {
        let sink = Sink {
            name: "out".to_string(),
            log: Some(LogConfig::default()),
            ..Default::default()
        };
        assert!(sink.validate().is_ok());
    }

    #[test]
    fn zero_variants_is_invalid() {
        let sink = Sink {
            name: "out".to_string(),
            ..Default::default()
        };
        assert_eq!(
            sink.validate(),
            Err(InvalidStep::MisconfiguredSink("out".to_string()))
        );
    }

    #[test]
    fn two_variants_is_invalid() {
        let sink = Sink {
            name: "out".to_string(),
            log: Some(LogConfig::default()),
            volume: Some(VolumeConfig {
                path: "/data".to_string(),
                poll_interval_secs: None,
            }),
            ..Default::default()
        };
        assert!(sink.validate().is_err());
    }

    #[test]
    fn unset_variants_are_omitted_from_json() {
        let sink = Sink {
            name: "out".to_string(),
            log: Some(LogConfig::default()),
            ..Default::default()
        };
        let json = serde_json::to_value(&sink).unwrap();
        assert_eq!(json, serde_json::json!({"name": "out", "log": {}}));
    }
}
