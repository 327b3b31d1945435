//! streamgrid-sidecar — the per-replica dataplane.
//!
//! The sidecar turns a step spec (as seen from inside one replica pod)
//! into a live message loop: it connects the declared sinks and sources
//! through the driver registry, routes every source message through the
//! user container, fans results out to all sinks in declaration order,
//! keeps the per-sink/per-source counters, and reports them back to the
//! step's status through the scheduler adapter.
//!
//! Sources run in parallel; the sink fan-out within one message is
//! sequential so sink ordering is observable. Every driver release runs
//! on shutdown, in reverse registration order, on all exit paths.

pub mod config;
pub mod error;
pub mod hooks;
pub mod http;
pub mod processor;
pub mod reporter;
pub mod runtime;
pub mod sinks;
pub mod sources;
pub mod status;

pub use config::SidecarConfig;
pub use error::SidecarError;
pub use hooks::StopHooks;
pub use processor::{HttpProcessor, UserProcessor};
pub use runtime::{Sidecar, SidecarOptions};
pub use sinks::SinkFanout;
pub use status::SharedStatus;
