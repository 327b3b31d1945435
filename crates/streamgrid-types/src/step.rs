//! Step objects — one stage of a pipeline, replicated N ways.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::InvalidStep;
use crate::keys;
use crate::meta::{Metadata, ObjectMeta, StepKey};
use crate::phase::StepPhase;
use crate::pod::{Container, PodSpec};
use crate::sink::Sink;
use crate::source::Source;

/// Declarative desired state of one pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    #[serde(default)]
    pub metadata: ObjectMeta,
    pub spec: StepSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<StepStatus>,
}

impl Step {
    pub fn key(&self) -> StepKey {
        StepKey::new(&self.metadata.namespace, &self.metadata.name)
    }

    /// The pipeline this step belongs to, from the well-known label.
    pub fn pipeline_name(&self) -> &str {
        self.metadata
            .labels
            .get(keys::KEY_PIPELINE_NAME)
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Replica count the status was last converged toward.
    pub fn current_replicas(&self) -> u32 {
        self.status.as_ref().map(|s| s.replicas).unwrap_or(0)
    }

    /// Replica count the spec asks for.
    pub fn target_replicas(&self) -> u32 {
        self.spec.replicas.unwrap_or(1)
    }
}

/// Spec of a step. Immutable from the reconciler's perspective.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<u32>,
    /// Extra labels/annotations propagated onto replica pods.
    #[serde(default, skip_serializing_if = "meta_is_empty")]
    pub metadata: Metadata,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<Source>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sinks: Vec<Sink>,
    /// Template for the user (main) container.
    #[serde(default)]
    pub container: ContainerTemplate,
}

fn meta_is_empty(m: &Metadata) -> bool {
    m.labels.is_empty() && m.annotations.is_empty()
}

impl StepSpec {
    /// Reject specs that must not be scheduled: empty names, duplicate
    /// sink/source names, records with zero or multiple transports.
    pub fn validate(&self) -> Result<(), InvalidStep> {
        if self.name.is_empty() {
            return Err(InvalidStep::EmptyName);
        }
        let mut seen = std::collections::HashSet::new();
        for sink in &self.sinks {
            sink.validate()?;
            if !seen.insert(sink.name.as_str()) {
                return Err(InvalidStep::DuplicateSink(sink.name.clone()));
            }
        }
        let mut seen = std::collections::HashSet::new();
        for source in &self.sources {
            source.validate()?;
            if !seen.insert(source.name.as_str()) {
                return Err(InvalidStep::DuplicateSource(source.name.clone()));
            }
        }
        Ok(())
    }

    /// Build the pod spec for one replica: the user container plus the
    /// sidecar wired up through environment variables.
    pub fn pod_spec(&self, pipeline_name: &str, namespace: &str, replica: u32) -> PodSpec {
        let spec_json = serde_json::to_string(self).expect("step spec serializes");
        let mut sidecar_env = BTreeMap::new();
        sidecar_env.insert(keys::ENV_STEP_SPEC.to_string(), spec_json);
        sidecar_env.insert(keys::ENV_REPLICA.to_string(), replica.to_string());
        sidecar_env.insert(
            keys::ENV_PIPELINE_NAME.to_string(),
            pipeline_name.to_string(),
        );
        sidecar_env.insert(keys::ENV_NAMESPACE.to_string(), namespace.to_string());

        PodSpec {
            containers: vec![
                Container {
                    name: keys::CTR_SIDECAR.to_string(),
                    image: keys::RUNNER_IMAGE.to_string(),
                    command: vec!["streamd".to_string(), "sidecar".to_string()],
                    args: Vec::new(),
                    env: sidecar_env,
                },
                Container {
                    name: keys::CTR_MAIN.to_string(),
                    image: self.container.image.clone(),
                    command: self.container.command.clone(),
                    args: self.container.args.clone(),
                    env: self.container.env.clone(),
                },
            ],
        }
    }
}

/// Template for the user container of a step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerTemplate {
    #[serde(default)]
    pub image: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

/// Observed state of a step.
///
/// The reconciler owns every field except the counter maps, which are
/// owned by the sidecars and patched through a separate operation. A
/// cleared counter map serializes to nothing, so a reconciler status
/// patch can never clobber sidecar counters under merge semantics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepStatus {
    #[serde(default)]
    pub phase: StepPhase,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(default)]
    pub replicas: u32,
    /// Unix seconds of the last replica-count change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_scaled_at: Option<u64>,
    #[serde(default, skip_serializing_if = "CounterStatuses::is_empty")]
    pub source_statuses: CounterStatuses,
    #[serde(default, skip_serializing_if = "CounterStatuses::is_empty")]
    pub sink_statuses: CounterStatuses,
}

/// Message counters for one sink or source at one replica.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub total_bytes: u64,
    #[serde(default)]
    pub errors: u64,
}

/// Per-name, per-replica counter map (`name -> replica -> counts`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CounterStatuses(pub BTreeMap<String, BTreeMap<u32, Counts>>);

impl CounterStatuses {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn incr_total(&mut self, name: &str, replica: u32, bytes: u64) {
        let counts = self
            .0
            .entry(name.to_string())
            .or_default()
            .entry(replica)
            .or_default();
        counts.total += 1;
        counts.total_bytes += bytes;
    }

    pub fn incr_errors(&mut self, name: &str, replica: u32) {
        self.0
            .entry(name.to_string())
            .or_default()
            .entry(replica)
            .or_default()
            .errors += 1;
    }

    pub fn get(&self, name: &str, replica: u32) -> Counts {
        self.0
            .get(name)
            .and_then(|replicas| replicas.get(&replica))
            .copied()
            .unwrap_or_default()
    }
}
