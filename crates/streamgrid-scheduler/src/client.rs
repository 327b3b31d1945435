//! The `SchedulerClient` trait — the narrow surface the controller and
//! sidecar use to talk to the underlying cluster scheduler.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;

use streamgrid_types::{CounterStatuses, Pod, Step, StepKey, StepStatus};

use crate::error::SchedulerResult;

/// Equality-based label selector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSelector(BTreeMap<String, String>);

impl LabelSelector {
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    /// True when every selector entry is present in `labels`.
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.0
            .iter()
            .all(|(k, v)| labels.get(k).is_some_and(|have| have == v))
    }
}

impl fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (k, v) in &self.0 {
            if !first {
                f.write_str(",")?;
            }
            write!(f, "{k}={v}")?;
            first = false;
        }
        Ok(())
    }
}

/// Severity of an emitted event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventLevel {
    Normal,
    Warning,
}

impl fmt::Display for EventLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventLevel::Normal => f.write_str("Normal"),
            EventLevel::Warning => f.write_str("Warning"),
        }
    }
}

/// An event recorded against a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub key: StepKey,
    pub level: EventLevel,
    pub reason: String,
    pub message: String,
}

/// Operations the reconciler and sidecar need from the scheduler.
///
/// Guarantees the adapter provides: at-least-once delivery of reconcile
/// events per affected step key, one in-flight `Reconcile` per key (via
/// [`crate::WorkQueue`]), and bounded deadlines on every call. Ordering
/// across keys is not guaranteed.
#[async_trait]
pub trait SchedulerClient: Send + Sync + 'static {
    async fn get_step(&self, key: &StepKey) -> SchedulerResult<Option<Step>>;

    async fn list_pods(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> SchedulerResult<Vec<Pod>>;

    /// Create a pod. Fails with `AlreadyExists` when a pod with the same
    /// name exists — callers rely on that for idempotent creation.
    async fn create_pod(&self, pod: Pod) -> SchedulerResult<()>;

    /// Delete a pod. Fails with `NotFound` when it is already gone.
    async fn delete_pod(&self, namespace: &str, name: &str) -> SchedulerResult<()>;

    /// Merge-patch a step's status. `expected_version` is the resource
    /// version the caller loaded; a mismatch fails with `Conflict`.
    /// Fields absent from the serialized patch are left untouched, so a
    /// patch with cleared counter maps never clobbers sidecar counters.
    async fn patch_step_status(
        &self,
        key: &StepKey,
        status: &StepStatus,
        expected_version: u64,
    ) -> SchedulerResult<()>;

    /// Merge the sidecar-owned counter maps into a step's status. This
    /// is the only status write the sidecar performs.
    async fn patch_step_counters(
        &self,
        key: &StepKey,
        source_statuses: &CounterStatuses,
        sink_statuses: &CounterStatuses,
    ) -> SchedulerResult<()>;

    async fn emit_event(
        &self,
        key: &StepKey,
        level: EventLevel,
        reason: &str,
        message: &str,
    ) -> SchedulerResult<()>;

    /// Run a command inside a container of a pod.
    async fn exec_in_container(
        &self,
        namespace: &str,
        pod: &str,
        container: &str,
        command: &[String],
    ) -> SchedulerResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_matches_subset() {
        let selector = LabelSelector::from_pairs(&[("a", "1"), ("b", "2")]);
        let mut labels = BTreeMap::new();
        labels.insert("a".to_string(), "1".to_string());
        labels.insert("b".to_string(), "2".to_string());
        labels.insert("c".to_string(), "3".to_string());
        assert!(selector.matches(&labels));

        labels.insert("b".to_string(), "other".to_string());
        assert!(!selector.matches(&labels));
    }

    #[test]
    fn selector_displays_as_requirements() {
        let selector = LabelSelector::from_pairs(&[("b", "2"), ("a", "1")]);
        assert_eq!(selector.to_string(), "a=1,b=2");
    }
}
