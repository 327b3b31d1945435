//! Step lifecycle phases and their aggregation order.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Coarse lifecycle label for a step.
///
/// Aggregation picks the worst phase across replica pods. `Failed` is the
/// worst; `Unknown` is the identity element — it never displaces a phase
/// observed from a real pod, so an aggregation seeded with `Unknown`
/// reports `Unknown` only when no pod contributed anything better.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepPhase {
    #[default]
    Unknown,
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl StepPhase {
    /// Aggregation rank: lower is worse, and worse wins.
    fn rank(self) -> u8 {
        match self {
            StepPhase::Failed => 0,
            StepPhase::Pending => 1,
            StepPhase::Running => 2,
            StepPhase::Succeeded => 3,
            StepPhase::Unknown => 4,
        }
    }

    /// A terminal step is never re-scheduled.
    pub fn is_terminal(self) -> bool {
        matches!(self, StepPhase::Succeeded | StepPhase::Failed)
    }
}

impl fmt::Display for StepPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StepPhase::Unknown => "Unknown",
            StepPhase::Pending => "Pending",
            StepPhase::Running => "Running",
            StepPhase::Succeeded => "Succeeded",
            StepPhase::Failed => "Failed",
        };
        f.write_str(s)
    }
}

/// A phase with its human-readable explanation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepPhaseMessage {
    pub phase: StepPhase,
    pub message: String,
}

impl StepPhaseMessage {
    pub fn new(phase: StepPhase, message: impl Into<String>) -> Self {
        Self {
            phase,
            message: message.into(),
        }
    }

    /// Pick the worse of two phase/message pairs. Ties keep `self`, so the
    /// message already present survives.
    pub fn min(self, other: StepPhaseMessage) -> StepPhaseMessage {
        if other.phase.rank() < self.phase.rank() {
            other
        } else {
            self
        }
    }
}
