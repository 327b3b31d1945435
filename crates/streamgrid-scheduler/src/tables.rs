//! redb table definitions for the object store.
//!
//! Each table uses `&str` keys and `&[u8]` values (JSON-serialized
//! objects). Keys follow the pattern `{namespace}/{name}`.

use redb::TableDefinition;

/// Step objects keyed by `{namespace}/{name}`.
pub const STEPS: TableDefinition<&str, &[u8]> = TableDefinition::new("steps");

/// Replica pods keyed by `{namespace}/{name}`.
pub const PODS: TableDefinition<&str, &[u8]> = TableDefinition::new("pods");
