//! Deterministic step-spec fingerprinting.
//!
//! The hash is SHA-256 over canonical JSON: object keys sorted, no
//! whitespace, UTF-8. Same spec, same hash, across processes and
//! restarts — rollouts are driven by hash inequality alone.

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::step::StepSpec;

/// Hex-encoded SHA-256 fingerprint of a step spec.
pub fn spec_hash(spec: &StepSpec) -> String {
    let value = serde_json::to_value(spec).expect("step spec serializes");
    let mut buf = Vec::new();
    write_canonical(&value, &mut buf);
    hex::encode(Sha256::digest(&buf))
}

fn write_canonical(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Object(map) => {
            out.push(b'{');
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                serde_json::to_writer(&mut *out, key).expect("string serializes");
                out.push(b':');
                write_canonical(&map[*key], out);
            }
            out.push(b'}');
        }
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_canonical(item, out);
            }
            out.push(b']');
        }
        scalar => serde_json::to_writer(&mut *out, scalar).expect("scalar serializes"),
    }
}
