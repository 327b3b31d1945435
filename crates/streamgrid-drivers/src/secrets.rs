//! Named-secret resolution for driver credentials.
//!
//! Secrets are referenced by `(name, key)` in the step spec. Resolution
//! checks the environment first (`NAME_KEY`, uppercased, separators
//! mapped to `_`), then the mounted secrets directory. The plumbing
//! that puts them there is the scheduler's concern, not ours.

use std::path::PathBuf;

use streamgrid_types::{keys, SecretRef};

use crate::error::{DriverError, DriverResult};

#[derive(Debug, Clone)]
pub struct Secrets {
    dir: PathBuf,
}

impl Secrets {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Secrets mounted at the conventional in-pod path.
    pub fn mounted() -> Self {
        Self::new(keys::PATH_SECRETS)
    }

    pub fn resolve(&self, secret: &SecretRef) -> DriverResult<String> {
        if let Ok(value) = std::env::var(env_key(secret)) {
            return Ok(value);
        }
        let path = self.dir.join(&secret.name).join(&secret.key);
        std::fs::read_to_string(&path)
            .map(|s| s.trim_end().to_string())
            .map_err(|e| {
                DriverError::Secret(format!("{}/{}: {e}", secret.name, secret.key))
            })
    }
}

fn env_key(secret: &SecretRef) -> String {
    format!("{}_{}", secret.name, secret.key)
        .to_uppercase()
        .replace(['-', '.', '/'], "_")
}
