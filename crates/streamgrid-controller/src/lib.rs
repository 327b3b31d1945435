//! streamgrid-controller — the control loop that converges steps.
//!
//! One reconcile pass loads a step, creates missing replica pods,
//! deletes at most one stale pod, aggregates pod observations into a
//! step phase, and merge-patches the status. The pass is idempotent:
//! repeated invocations on an unchanged world produce the same world.
//!
//! The [`ControllerRunner`] drains a [`streamgrid_scheduler::WorkQueue`]
//! single-flight per key, converts panics into retries, and schedules
//! requeues.

pub mod error;
pub mod killer;
pub mod phase;
pub mod reconciler;
pub mod runner;

pub use error::ReconcileError;
pub use killer::{AnnotationKiller, ContainerKiller, KillError};
pub use phase::infer_phase;
pub use reconciler::{Reconcile, RequeuePolicy, StepReconciler};
pub use runner::ControllerRunner;
