//! streamgrid-types — declarative object model for StreamGrid pipelines.
//!
//! A pipeline is a labeled group of [`Step`]s. Each step runs a user
//! container replicated N ways; replicas are [`Pod`] objects owned by the
//! step. Steps declare ordered lists of [`Source`]s and [`Sink`]s, each a
//! record with exactly one transport variant populated.
//!
//! All types are serde-serializable: the scheduler stores them as JSON,
//! the sidecar receives the step spec through an environment variable,
//! and status updates travel as JSON merge patches.

pub mod error;
pub mod hash;
pub mod keys;
pub mod meta;
pub mod phase;
pub mod pod;
pub mod sink;
pub mod source;
pub mod step;
pub mod transport;

pub use error::InvalidStep;
pub use hash::spec_hash;
pub use meta::{Metadata, ObjectMeta, OwnerReference, StepKey};
pub use phase::{StepPhase, StepPhaseMessage};
pub use pod::{Container, ContainerState, ContainerStatus, Pod, PodPhase, PodSpec, PodStatus};
pub use sink::Sink;
pub use source::Source;
pub use step::{ContainerTemplate, Counts, CounterStatuses, Step, StepSpec, StepStatus};
pub use transport::*;
