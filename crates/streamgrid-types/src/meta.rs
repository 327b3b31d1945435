//! Object metadata shared by steps and pods.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Namespaced identity of a step, used as the reconcile key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StepKey {
    pub namespace: String,
    pub name: String,
}

impl StepKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for StepKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

impl FromStr for StepKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((ns, name)) if !ns.is_empty() && !name.is_empty() => Ok(Self::new(ns, name)),
            _ => Err(format!("invalid step key {s:?}, expected namespace/name")),
        }
    }
}

/// Reference from an owned object back to its controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerReference {
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub controller: bool,
}

impl OwnerReference {
    /// Controller reference to a step.
    pub fn step(name: impl Into<String>) -> Self {
        Self {
            kind: "Step".to_string(),
            name: name.into(),
            controller: true,
        }
    }
}

/// Metadata of a stored object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectMeta {
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owner_references: Vec<OwnerReference>,
    /// Set when the object is being deleted (unix seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_timestamp: Option<u64>,
    /// Monotone version counter maintained by the scheduler.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub resource_version: u64,
}

fn is_zero(v: &u64) -> bool {
    *v == 0
}

/// User-supplied labels and annotations propagated onto replica pods.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_key_round_trips_through_display() {
        let key = StepKey::new("default", "map");
        assert_eq!(key.to_string(), "default/map");
        assert_eq!("default/map".parse::<StepKey>().unwrap(), key);
    }

    #[test]
    fn step_key_rejects_malformed_strings() {
        assert!("no-slash".parse::<StepKey>().is_err());
        assert!("/empty-ns".parse::<StepKey>().is_err());
        assert!("ns/".parse::<StepKey>().is_err());
    }

    #[test]
    fn empty_meta_serializes_compactly() {
        let meta = ObjectMeta {
            namespace: "ns".to_string(),
            name: "a".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"namespace": "ns", "name": "a"})
        );
    }
}
