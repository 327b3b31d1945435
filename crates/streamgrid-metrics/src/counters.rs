//! Labeled counter vectors backed by atomics.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// A registry of counter vectors, shared across subsystems.
#[derive(Clone, Default)]
pub struct Registry {
    vecs: Arc<RwLock<Vec<Arc<CounterVec>>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a counter vector. Registering the same name twice
    /// returns the existing vector.
    pub fn counter_vec(
        &self,
        name: &str,
        help: &str,
        label_names: &[&str],
    ) -> Arc<CounterVec> {
        let mut vecs = self.vecs.write().expect("metrics registry lock");
        if let Some(existing) = vecs.iter().find(|v| v.name == name) {
            return existing.clone();
        }
        let vec = Arc::new(CounterVec {
            name: name.to_string(),
            help: help.to_string(),
            label_names: label_names.iter().map(|l| l.to_string()).collect(),
            values: RwLock::new(HashMap::new()),
        });
        vecs.push(vec.clone());
        vec
    }

    /// Snapshot all vectors for rendering.
    pub fn gather(&self) -> Vec<Arc<CounterVec>> {
        self.vecs.read().expect("metrics registry lock").clone()
    }
}

/// A monotone counter split by label values.
pub struct CounterVec {
    pub(crate) name: String,
    pub(crate) help: String,
    pub(crate) label_names: Vec<String>,
    values: RwLock<HashMap<Vec<String>, Arc<AtomicU64>>>,
}

impl CounterVec {
    /// Counter handle for one label combination. The label value count
    /// must match the registered label names.
    pub fn with_label_values(&self, labels: &[&str]) -> CounterHandle {
        debug_assert_eq!(labels.len(), self.label_names.len());
        let key: Vec<String> = labels.iter().map(|l| l.to_string()).collect();
        {
            let values = self.values.read().expect("counter vec lock");
            if let Some(cell) = values.get(&key) {
                return CounterHandle(cell.clone());
            }
        }
        let mut values = self.values.write().expect("counter vec lock");
        let cell = values.entry(key).or_default();
        CounterHandle(cell.clone())
    }

    /// Snapshot of (label values, count) pairs, sorted for stable output.
    pub fn samples(&self) -> Vec<(Vec<String>, u64)> {
        let values = self.values.read().expect("counter vec lock");
        let mut samples: Vec<(Vec<String>, u64)> = values
            .iter()
            .map(|(labels, cell)| (labels.clone(), cell.load(Ordering::Relaxed)))
            .collect();
        samples.sort();
        samples
    }
}

/// Handle to one counter cell; cheap to clone and inc.
#[derive(Clone)]
pub struct CounterHandle(Arc<AtomicU64>);

impl CounterHandle {
    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

impl Default for CounterHandle {
    fn default() -> Self {
        Self(Arc::new(AtomicU64::new(0)))
    }
}
