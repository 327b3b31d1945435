//! Sidecar configuration from the pod environment.
//!
//! The controller stamps the step spec, replica index, pipeline name,
//! and namespace into the sidecar container's environment when it
//! builds the replica pod.

use streamgrid_types::{keys, StepKey, StepSpec};

use crate::error::SidecarError;

#[derive(Debug, Clone)]
pub struct SidecarConfig {
    pub namespace: String,
    pub pipeline_name: String,
    pub replica: u32,
    pub spec: StepSpec,
}

impl SidecarConfig {
    /// Load and validate the configuration from the environment. A spec
    /// that fails validation (duplicate names, misconfigured variants)
    /// is rejected here, before any driver connects.
    pub fn from_env() -> Result<Self, SidecarError> {
        let raw = std::env::var(keys::ENV_STEP_SPEC)
            .map_err(|_| SidecarError::Config(format!("{} is not set", keys::ENV_STEP_SPEC)))?;
        let spec: StepSpec = serde_json::from_str(&raw)
            .map_err(|e| SidecarError::Config(format!("{}: {e}", keys::ENV_STEP_SPEC)))?;
        spec.validate()?;

        let replica = std::env::var(keys::ENV_REPLICA)
            .map_err(|_| SidecarError::Config(format!("{} is not set", keys::ENV_REPLICA)))?
            .parse()
            .map_err(|e| SidecarError::Config(format!("{}: {e}", keys::ENV_REPLICA)))?;

        Ok(Self {
            namespace: std::env::var(keys::ENV_NAMESPACE)
                .unwrap_or_else(|_| "default".to_string()),
            pipeline_name: std::env::var(keys::ENV_PIPELINE_NAME).unwrap_or_default(),
            replica,
            spec,
        })
    }

    /// Key of the owning step, for status reporting.
    pub fn step_key(&self) -> StepKey {
        StepKey::new(&self.namespace, &self.spec.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use streamgrid_types::{LogConfig, Sink};

    fn valid_spec() -> StepSpec {
        StepSpec {
            name: "map".to_string(),
            sinks: vec![Sink {
                name: "out".to_string(),
                log: Some(LogConfig::default()),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn from_env_round_trips_the_spec() {
        std::env::set_var(keys::ENV_STEP_SPEC, serde_json::to_string(&valid_spec()).unwrap());
        std::env::set_var(keys::ENV_REPLICA, "3");
        std::env::set_var(keys::ENV_PIPELINE_NAME, "pl");
        std::env::set_var(keys::ENV_NAMESPACE, "prod");

        let config = SidecarConfig::from_env().unwrap();
        assert_eq!(config.replica, 3);
        assert_eq!(config.pipeline_name, "pl");
        assert_eq!(config.spec, valid_spec());
        assert_eq!(config.step_key(), StepKey::new("prod", "map"));

        std::env::remove_var(keys::ENV_STEP_SPEC);
        std::env::remove_var(keys::ENV_REPLICA);
        std::env::remove_var(keys::ENV_PIPELINE_NAME);
        std::env::remove_var(keys::ENV_NAMESPACE);
    }
}
