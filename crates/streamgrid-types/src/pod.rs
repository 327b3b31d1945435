//! Replica pods — the scheduler objects a step converges toward.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::keys;
use crate::meta::ObjectMeta;

/// One replica of a step, owned by it via controller reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pod {
    #[serde(default)]
    pub metadata: ObjectMeta,
    pub spec: PodSpec,
    #[serde(default)]
    pub status: PodStatus,
}

impl Pod {
    /// Replica index from the well-known annotation.
    pub fn replica(&self) -> Option<u32> {
        self.metadata
            .annotations
            .get(keys::KEY_REPLICA)
            .and_then(|raw| raw.parse().ok())
    }

    /// Spec fingerprint the pod was created from.
    pub fn spec_hash(&self) -> &str {
        self.metadata
            .annotations
            .get(keys::KEY_HASH)
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Kill command for a container, from its annotation.
    pub fn kill_cmd(&self, container: &str) -> Option<Vec<String>> {
        let raw = self.metadata.annotations.get(&keys::key_kill_cmd(container))?;
        serde_json::from_str(raw).ok()
    }

    /// Whether the main container has terminated (any exit code).
    pub fn main_terminated(&self) -> bool {
        self.status.container_statuses.iter().any(|cs| {
            cs.name == keys::CTR_MAIN
                && matches!(cs.state, ContainerState::Terminated { .. })
        })
    }
}

/// Containers to run in a replica pod.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PodSpec {
    pub containers: Vec<Container>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub name: String,
    pub image: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

/// Observed pod state as reported by the scheduler.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PodStatus {
    #[serde(default)]
    pub phase: PodPhase,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub container_statuses: Vec<ContainerStatus>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PodPhase {
    #[default]
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerStatus {
    pub name: String,
    #[serde(default)]
    pub ready: bool,
    pub state: ContainerState,
}

/// Lifecycle state of one container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ContainerState {
    Waiting {
        #[serde(default)]
        reason: String,
    },
    Running,
    Terminated {
        exit_code: i32,
        #[serde(default, skip_serializing_if = "String::is_empty")]
        reason: String,
    },
}
