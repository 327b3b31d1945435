//! LocalScheduler — single-node scheduler adapter.
//!
//! Implements [`SchedulerClient`] over the redb [`ObjectStore`]: steps
//! and pods are plain stored objects, owner references drive cascade
//! deletion, and a resource-version counter on each step backs the
//! optimistic-concurrency check on status patches. Watchers receive the
//! affected step key on every mutation; events and execs are recorded
//! (and logged) so callers and tests can observe them.
//!
//! Calls complete in-process, so the adapter's deadline guarantee holds
//! trivially; a remote adapter would wrap each call in a timeout.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info};

use streamgrid_types::{
    keys, CounterStatuses, Pod, PodStatus, Step, StepKey, StepStatus,
};

use crate::client::{Event, EventLevel, LabelSelector, SchedulerClient};
use crate::error::{SchedulerError, SchedulerResult};
use crate::store::ObjectStore;

/// A command executed inside a container, as observed by the adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecRecord {
    pub namespace: String,
    pub pod: String,
    pub container: String,
    pub command: Vec<String>,
}

struct Inner {
    store: ObjectStore,
    watchers: Mutex<Vec<mpsc::UnboundedSender<StepKey>>>,
    events: Mutex<Vec<Event>>,
    execs: Mutex<Vec<ExecRecord>>,
}

/// Single-node scheduler backed by the object store.
#[derive(Clone)]
pub struct LocalScheduler {
    inner: Arc<Inner>,
}

impl LocalScheduler {
    pub fn new(store: ObjectStore) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                watchers: Mutex::new(Vec::new()),
                events: Mutex::new(Vec::new()),
                execs: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Ephemeral scheduler for tests and data-dir-less runs.
    pub fn open_in_memory() -> SchedulerResult<Self> {
        Ok(Self::new(ObjectStore::open_in_memory()?))
    }

    /// Register a watcher. Every step or owned-pod mutation sends the
    /// affected step key; feed the receiver into a [`crate::WorkQueue`].
    pub fn watch(&self) -> mpsc::UnboundedReceiver<StepKey> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner
            .watchers
            .lock()
            .expect("watchers lock")
            .push(tx);
        rx
    }

    fn notify(&self, key: &StepKey) {
        let mut watchers = self.inner.watchers.lock().expect("watchers lock");
        watchers.retain(|tx| tx.send(key.clone()).is_ok());
    }

    /// Create or update a step. The stored status is preserved when the
    /// incoming object carries none; the resource version is bumped.
    pub fn apply_step(&self, mut step: Step) -> SchedulerResult<Step> {
        let key = step.key();
        let stored = self.inner.store.get_step(&key.to_string())?;
        match stored {
            Some(existing) => {
                if step.status.is_none() {
                    step.status = existing.status;
                }
                step.metadata.resource_version = existing.metadata.resource_version + 1;
            }
            None => step.metadata.resource_version = 1,
        }
        self.inner.store.put_step(&key.to_string(), &step)?;
        debug!(step = %key, version = step.metadata.resource_version, "step applied");
        self.notify(&key);
        Ok(step)
    }

    /// Delete a step and cascade to its owned pods.
    pub fn delete_step(&self, key: &StepKey) -> SchedulerResult<()> {
        let step = self
            .inner
            .store
            .get_step(&key.to_string())?
            .ok_or_else(|| SchedulerError::NotFound(key.to_string()))?;
        let selector = LabelSelector::from_pairs(&[
            (keys::KEY_STEP_NAME, &step.spec.name),
            (keys::KEY_PIPELINE_NAME, step.pipeline_name()),
        ]);
        for pod in self.inner.store.list_pods(&key.namespace, &selector)? {
            self.inner
                .store
                .delete_pod(&format!("{}/{}", key.namespace, pod.metadata.name))?;
        }
        self.inner.store.delete_step(&key.to_string())?;
        info!(step = %key, "step deleted");
        self.notify(key);
        Ok(())
    }

    pub fn list_steps(&self) -> SchedulerResult<Vec<Step>> {
        self.inner.store.list_steps()
    }

    pub fn get_pod(&self, namespace: &str, name: &str) -> SchedulerResult<Option<Pod>> {
        self.inner.store.get_pod(&format!("{namespace}/{name}"))
    }

    /// Update a pod's observed status (what a node agent would report)
    /// and notify the owning step.
    pub fn update_pod_status(
        &self,
        namespace: &str,
        name: &str,
        status: PodStatus,
    ) -> SchedulerResult<()> {
        let key = format!("{namespace}/{name}");
        let mut pod = self
            .inner
            .store
            .get_pod(&key)?
            .ok_or_else(|| SchedulerError::NotFound(key.clone()))?;
        pod.status = status;
        self.inner.store.put_pod(&key, &pod)?;
        if let Some(owner) = owner_step_key(&pod) {
            self.notify(&owner);
        }
        Ok(())
    }

    /// Events recorded so far.
    pub fn events(&self) -> Vec<Event> {
        self.inner.events.lock().expect("events lock").clone()
    }

    /// Exec invocations recorded so far.
    pub fn execs(&self) -> Vec<ExecRecord> {
        self.inner.execs.lock().expect("execs lock").clone()
    }
}

/// Step key owning a pod, from its controller reference.
fn owner_step_key(pod: &Pod) -> Option<StepKey> {
    pod.metadata
        .owner_references
        .iter()
        .find(|r| r.controller && r.kind == "Step")
        .map(|r| StepKey::new(&pod.metadata.namespace, &r.name))
}

/// JSON merge patch (RFC 7386): objects recurse, everything else
/// replaces. Our patches never carry nulls, so removal is not needed.
fn merge_json(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(target_map), Value::Object(patch_map)) => {
            for (key, value) in patch_map {
                merge_json(target_map.entry(key).or_insert(Value::Null), value);
            }
        }
        (target, patch) => *target = patch,
    }
}

#[async_trait]
impl SchedulerClient for LocalScheduler {
    async fn get_step(&self, key: &StepKey) -> SchedulerResult<Option<Step>> {
        self.inner.store.get_step(&key.to_string())
    }

    async fn list_pods(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> SchedulerResult<Vec<Pod>> {
        self.inner.store.list_pods(namespace, selector)
    }

    async fn create_pod(&self, pod: Pod) -> SchedulerResult<()> {
        let key = format!("{}/{}", pod.metadata.namespace, pod.metadata.name);
        if self.inner.store.get_pod(&key)?.is_some() {
            return Err(SchedulerError::AlreadyExists(key));
        }
        let owner = owner_step_key(&pod);
        self.inner.store.put_pod(&key, &pod)?;
        debug!(pod = %key, "pod created");
        if let Some(owner) = owner {
            self.notify(&owner);
        }
        Ok(())
    }

    async fn delete_pod(&self, namespace: &str, name: &str) -> SchedulerResult<()> {
        let key = format!("{namespace}/{name}");
        let pod = self
            .inner
            .store
            .get_pod(&key)?
            .ok_or_else(|| SchedulerError::NotFound(key.clone()))?;
        self.inner.store.delete_pod(&key)?;
        debug!(pod = %key, "pod deleted");
        if let Some(owner) = owner_step_key(&pod) {
            self.notify(&owner);
        }
        Ok(())
    }

    async fn patch_step_status(
        &self,
        key: &StepKey,
        status: &StepStatus,
        expected_version: u64,
    ) -> SchedulerResult<()> {
        let mut step = self
            .inner
            .store
            .get_step(&key.to_string())?
            .ok_or_else(|| SchedulerError::NotFound(key.to_string()))?;
        if step.metadata.resource_version != expected_version {
            return Err(SchedulerError::Conflict(format!(
                "{key}: version {} != expected {expected_version}",
                step.metadata.resource_version
            )));
        }
        let patch = serde_json::to_value(status).map_err(|e| {
            SchedulerError::Serialize(e.to_string())
        })?;
        let mut current = serde_json::to_value(step.status.take().unwrap_or_default())
            .map_err(|e| SchedulerError::Serialize(e.to_string()))?;
        merge_json(&mut current, patch);
        step.status = Some(
            serde_json::from_value(current)
                .map_err(|e| SchedulerError::Serialize(e.to_string()))?,
        );
        step.metadata.resource_version += 1;
        self.inner.store.put_step(&key.to_string(), &step)?;
        debug!(step = %key, "status patched");
        self.notify(key);
        Ok(())
    }

    async fn patch_step_counters(
        &self,
        key: &StepKey,
        source_statuses: &CounterStatuses,
        sink_statuses: &CounterStatuses,
    ) -> SchedulerResult<()> {
        let mut step = self
            .inner
            .store
            .get_step(&key.to_string())?
            .ok_or_else(|| SchedulerError::NotFound(key.to_string()))?;
        let patch = serde_json::json!({
            "source_statuses": source_statuses,
            "sink_statuses": sink_statuses,
        });
        let mut current = serde_json::to_value(step.status.take().unwrap_or_default())
            .map_err(|e| SchedulerError::Serialize(e.to_string()))?;
        merge_json(&mut current, patch);
        step.status = Some(
            serde_json::from_value(current)
                .map_err(|e| SchedulerError::Serialize(e.to_string()))?,
        );
        step.metadata.resource_version += 1;
        self.inner.store.put_step(&key.to_string(), &step)?;
        self.notify(key);
        Ok(())
    }

    async fn emit_event(
        &self,
        key: &StepKey,
        level: EventLevel,
        reason: &str,
        message: &str,
    ) -> SchedulerResult<()> {
        info!(step = %key, %level, reason, message, "event");
        self.inner.events.lock().expect("events lock").push(Event {
            key: key.clone(),
            level,
            reason: reason.to_string(),
            message: message.to_string(),
        });
        Ok(())
    }

    async fn exec_in_container(
        &self,
        namespace: &str,
        pod: &str,
        container: &str,
        command: &[String],
    ) -> SchedulerResult<()> {
        let key = format!("{namespace}/{pod}");
        if self.inner.store.get_pod(&key)?.is_none() {
            return Err(SchedulerError::NotFound(key));
        }
        debug!(pod = %key, container, ?command, "exec");
        self.inner.execs.lock().expect("execs lock").push(ExecRecord {
            namespace: namespace.to_string(),
            pod: pod.to_string(),
            container: container.to_string(),
            command: command.to_vec(),
        });
        Ok(())
    }
}
