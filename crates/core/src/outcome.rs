//! Step and pipeline outcomes.
//!
//! These are the only values that cross the pipeline boundary. The
//! specific error that caused a failure is logged and recorded, but the
//! outcome itself is binary.

use serde::{Deserialize, Serialize};

/// Result of a single pipeline step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    Completed,
    Failed,
}

/// Final result of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineOutcome {
    Completed,
    Failed,
}

impl StepOutcome {
    /// Value stored in the `status` column of `step_executions`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl PipelineOutcome {
    /// Value stored in the `status` column of `pipeline_runs`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_success(self) -> bool {
        self == Self::Completed
    }
}

impl From<StepOutcome> for PipelineOutcome {
    fn from(value: StepOutcome) -> Self {
        match value {
            StepOutcome::Completed => Self::Completed,
            StepOutcome::Failed => Self::Failed,
        }
    }
}

impl std::fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Display for PipelineOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
