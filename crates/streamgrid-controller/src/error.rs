//! Error types for reconcile passes.

use thiserror::Error;

use streamgrid_scheduler::SchedulerError;

use crate::killer::KillError;

/// A failed reconcile pass. The runner logs it and re-enqueues the key.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("failed to create pod {name}: {source}")]
    CreatePod {
        name: String,
        source: SchedulerError,
    },

    #[error("failed to delete pod {name}: {source}")]
    DeletePod {
        name: String,
        source: SchedulerError,
    },

    #[error("failed to kill container {pod}/{container}: {source}")]
    KillContainer {
        pod: String,
        container: String,
        source: KillError,
    },

    #[error("failed to patch status: {0}")]
    PatchStatus(SchedulerError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}
