//! streamgrid-scheduler — adapter between the controller and the
//! underlying cluster scheduler.
//!
//! The [`SchedulerClient`] trait is the narrow surface the reconciler
//! and the sidecar use: get/list/create/delete, status and counter
//! patches with merge semantics, events, and in-container exec. The
//! [`LocalScheduler`] implements it for single-node deployments and
//! tests, backed by a redb object store; the [`WorkQueue`] provides the
//! at-least-once, single-flight-per-key delivery the control loop
//! relies on.

pub mod client;
pub mod error;
pub mod local;
pub mod queue;
pub mod store;
pub mod tables;

pub use client::{Event, EventLevel, LabelSelector, SchedulerClient};
pub use error::{SchedulerError, SchedulerResult};
pub use local::{ExecRecord, LocalScheduler};
pub use queue::WorkQueue;
pub use store::ObjectStore;
