//! ObjectStore — redb-backed persistence for steps and pods.
//!
//! All values are JSON-serialized into redb's `&[u8]` value columns
//! under `{namespace}/{name}` keys. The store supports both on-disk and
//! in-memory backends (the latter for testing) and is `Clone + Send +
//! Sync` via `Arc<Database>`.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableTable};
use tracing::debug;

use streamgrid_types::{Pod, Step};

use crate::client::LabelSelector;
use crate::error::{SchedulerError, SchedulerResult};
use crate::tables::{PODS, STEPS};

/// Convert any `Display` error into a `SchedulerError` variant.
macro_rules! map_err {
    ($variant:ident) => {
        |e| SchedulerError::$variant(e.to_string())
    };
}

/// Thread-safe object store backed by redb.
#[derive(Clone)]
pub struct ObjectStore {
    db: Arc<Database>,
}

impl ObjectStore {
    /// Open (or create) a persistent store at the given path.
    pub fn open(path: &Path) -> SchedulerResult<Self> {
        let db = Database::create(path).map_err(map_err!(Store))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "object store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory store (for testing and standalone
    /// runs without a data directory).
    pub fn open_in_memory() -> SchedulerResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Store))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory object store opened");
        Ok(store)
    }

    fn ensure_tables(&self) -> SchedulerResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Store))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(STEPS).map_err(map_err!(Store))?;
        txn.open_table(PODS).map_err(map_err!(Store))?;
        txn.commit().map_err(map_err!(Store))?;
        Ok(())
    }

    // ── Steps ──────────────────────────────────────────────────────

    pub fn put_step(&self, key: &str, step: &Step) -> SchedulerResult<()> {
        let value = serde_json::to_vec(step).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Store))?;
        {
            let mut table = txn.open_table(STEPS).map_err(map_err!(Store))?;
            table
                .insert(key, value.as_slice())
                .map_err(map_err!(Store))?;
        }
        txn.commit().map_err(map_err!(Store))?;
        Ok(())
    }

    pub fn get_step(&self, key: &str) -> SchedulerResult<Option<Step>> {
        let txn = self.db.begin_read().map_err(map_err!(Store))?;
        let table = txn.open_table(STEPS).map_err(map_err!(Store))?;
        match table.get(key).map_err(map_err!(Store))? {
            Some(guard) => {
                let step: Step =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Serialize))?;
                Ok(Some(step))
            }
            None => Ok(None),
        }
    }

    pub fn list_steps(&self) -> SchedulerResult<Vec<Step>> {
        let txn = self.db.begin_read().map_err(map_err!(Store))?;
        let table = txn.open_table(STEPS).map_err(map_err!(Store))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Store))? {
            let (_, value) = entry.map_err(map_err!(Store))?;
            let step: Step =
                serde_json::from_slice(value.value()).map_err(map_err!(Serialize))?;
            results.push(step);
        }
        Ok(results)
    }

    /// Delete a step by key. Returns true if it existed.
    pub fn delete_step(&self, key: &str) -> SchedulerResult<bool> {
        let txn = self.db.begin_write().map_err(map_err!(Store))?;
        let existed;
        {
            let mut table = txn.open_table(STEPS).map_err(map_err!(Store))?;
            existed = table.remove(key).map_err(map_err!(Store))?.is_some();
        }
        txn.commit().map_err(map_err!(Store))?;
        Ok(existed)
    }

    // ── Pods ───────────────────────────────────────────────────────

    pub fn put_pod(&self, key: &str, pod: &Pod) -> SchedulerResult<()> {
        let value = serde_json::to_vec(pod).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Store))?;
        {
            let mut table = txn.open_table(PODS).map_err(map_err!(Store))?;
            table
                .insert(key, value.as_slice())
                .map_err(map_err!(Store))?;
        }
        txn.commit().map_err(map_err!(Store))?;
        Ok(())
    }

    pub fn get_pod(&self, key: &str) -> SchedulerResult<Option<Pod>> {
        let txn = self.db.begin_read().map_err(map_err!(Store))?;
        let table = txn.open_table(PODS).map_err(map_err!(Store))?;
        match table.get(key).map_err(map_err!(Store))? {
            Some(guard) => {
                let pod: Pod =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Serialize))?;
                Ok(Some(pod))
            }
            None => Ok(None),
        }
    }

    /// List pods in a namespace whose labels match the selector.
    pub fn list_pods(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> SchedulerResult<Vec<Pod>> {
        let prefix = format!("{namespace}/");
        let txn = self.db.begin_read().map_err(map_err!(Store))?;
        let table = txn.open_table(PODS).map_err(map_err!(Store))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Store))? {
            let (key, value) = entry.map_err(map_err!(Store))?;
            if !key.value().starts_with(&prefix) {
                continue;
            }
            let pod: Pod =
                serde_json::from_slice(value.value()).map_err(map_err!(Serialize))?;
            if selector.matches(&pod.metadata.labels) {
                results.push(pod);
            }
        }
        Ok(results)
    }

    /// Delete a pod by key. Returns true if it existed.
    pub fn delete_pod(&self, key: &str) -> SchedulerResult<bool> {
        let txn = self.db.begin_write().map_err(map_err!(Store))?;
        let existed;
        {
            let mut table = txn.open_table(PODS).map_err(map_err!(Store))?;
            existed = table.remove(key).map_err(map_err!(Store))?.is_some();
        }
        txn.commit().map_err(map_err!(Store))?;
        Ok(existed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use streamgrid_types::{ObjectMeta, PodSpec, StepSpec};

    fn test_step(name: &str) -> Step {
        Step {
            metadata: ObjectMeta {
                namespace: "default".to_string(),
                name: name.to_string(),
                ..Default::default()
            },
            spec: StepSpec {
                name: name.to_string(),
                ..Default::default()
            },
            status: None,
        }
    }

    fn test_pod(name: &str, labels: &[(&str, &str)]) -> Pod {
        Pod {
            metadata: ObjectMeta {
                namespace: "default".to_string(),
                name: name.to_string(),
                labels: labels
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                ..Default::default()
            },
            spec: PodSpec::default(),
            status: Default::default(),
        }
    }

    #[test]
    fn step_round_trip() {
        let store = ObjectStore::open_in_memory().unwrap();
        let step = test_step("map");
        store.put_step("default/map", &step).unwrap();
        assert_eq!(store.get_step("default/map").unwrap(), Some(step));
        assert_eq!(store.get_step("default/missing").unwrap(), None);
    }

    #[test]
    fn delete_step_reports_existence() {
        let store = ObjectStore::open_in_memory().unwrap();
        store.put_step("default/map", &test_step("map")).unwrap();
        assert!(store.delete_step("default/map").unwrap());
        assert!(!store.delete_step("default/map").unwrap());
    }

    #[test]
    fn list_pods_filters_by_namespace_and_labels() {
        let store = ObjectStore::open_in_memory().unwrap();
        store
            .put_pod("default/map-0", &test_pod("map-0", &[("step", "map")]))
            .unwrap();
        store
            .put_pod("default/other-0", &test_pod("other-0", &[("step", "other")]))
            .unwrap();
        store
            .put_pod("prod/map-0", &test_pod("map-0", &[("step", "map")]))
            .unwrap();

        let selector = LabelSelector::from_pairs(&[("step", "map")]);
        let pods = store.list_pods("default", &selector).unwrap();
        assert_eq!(pods.len(), 1);
        assert_eq!(pods[0].metadata.name, "map-0");
    }
}
