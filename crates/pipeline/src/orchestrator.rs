//! Sequencing of the generate and load steps.
//!
//! ```text
//! validate params -> allocate run id -> generate -> (Completed) load -> record outcome
//! ```
//!
//! Only a missing parameter or a failed run-id allocation escapes
//! [`PipelineOrchestrator::execute`] as an error. Everything after the run
//! id exists ends as a recorded [`PipelineOutcome`].

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use kbatch_core::outcome::{PipelineOutcome, StepOutcome};
use kbatch_core::error::CoreError;
use kbatch_core::params::{JobParameters, INPUT_FILE_LOCATION};
use kbatch_core::types::RunId;
use tokio_util::sync::CancellationToken;

use crate::external_step::ExternalJobStep;
use crate::load::ChunkedLoadStep;
use crate::repository::{CompletionListener, JobRepository, RepositoryError};

pub const PIPELINE_NAME: &str = "generate-and-load";
pub const GENERATE_STEP: &str = "generate";
pub const LOAD_STEP: &str = "load";

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Failed to allocate run identity: {0}")]
    Repository(#[from] RepositoryError),
}

/// Result of one pipeline invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineExecution {
    pub run_id: RunId,
    pub outcome: PipelineOutcome,
    pub records_written: u64,
}

pub struct PipelineOrchestrator {
    repository: Arc<dyn JobRepository>,
    generate: ExternalJobStep,
    load: ChunkedLoadStep,
    step_timeout: Duration,
    listener: Option<Arc<dyn CompletionListener>>,
}

impl PipelineOrchestrator {
    pub fn new(
        repository: Arc<dyn JobRepository>,
        generate: ExternalJobStep,
        load: ChunkedLoadStep,
        step_timeout: Duration,
    ) -> Self {
        Self {
            repository,
            generate,
            load,
            step_timeout,
            listener: None,
        }
    }

    pub fn with_listener(mut self, listener: Arc<dyn CompletionListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub async fn execute(
        &self,
        params: &JobParameters,
        cancel: &CancellationToken,
    ) -> Result<PipelineExecution, PipelineError> {
        let file_location = required_file_location(params)?;

        let run_id = self
            .repository
            .allocate_run_identity(PIPELINE_NAME, params)
            .await?;
        tracing::info!(run_id = %run_id, file = file_location, "Pipeline run started");

        let generated = self
            .generate
            .run(run_id, params, cancel, self.step_timeout)
            .await;
        let (outcome, error) = match generated {
            Ok(StepOutcome::Completed) => (StepOutcome::Completed, None),
            Ok(StepOutcome::Failed) => (
                StepOutcome::Failed,
                Some("workload reported failure".to_string()),
            ),
            Err(e) => (StepOutcome::Failed, Some(e.to_string())),
        };
        self.record_step(run_id, GENERATE_STEP, outcome, error.as_deref())
            .await;
        if outcome != StepOutcome::Completed {
            return Ok(self.finish(run_id, PipelineOutcome::Failed, 0).await);
        }

        let (outcome, error, records_written) =
            match self.load.run(Path::new(file_location), cancel).await {
                Ok(summary) => (StepOutcome::Completed, None, summary.records_written),
                Err(e) => {
                    tracing::warn!(run_id = %run_id, error = %e, "Load step failed");
                    (StepOutcome::Failed, Some(e.to_string()), 0)
                }
            };
        self.record_step(run_id, LOAD_STEP, outcome, error.as_deref())
            .await;

        // The load step is last, so its outcome is the pipeline's.
        Ok(self.finish(run_id, outcome.into(), records_written).await)
    }

    // ---- private helpers ----

    async fn record_step(
        &self,
        run_id: RunId,
        step_name: &str,
        outcome: StepOutcome,
        error: Option<&str>,
    ) {
        if let Err(e) = self
            .repository
            .record_step_outcome(run_id, step_name, outcome, error)
            .await
        {
            tracing::error!(
                run_id = %run_id,
                step = step_name,
                error = %e,
                "Failed to record step outcome",
            );
        }
    }

    async fn finish(
        &self,
        run_id: RunId,
        outcome: PipelineOutcome,
        records_written: u64,
    ) -> PipelineExecution {
        if let Err(e) = self
            .repository
            .record_pipeline_outcome(run_id, outcome)
            .await
        {
            tracing::error!(run_id = %run_id, error = %e, "Failed to record pipeline outcome");
        }
        tracing::info!(run_id = %run_id, %outcome, records_written, "Pipeline run finished");

        if outcome.is_success() {
            if let Some(listener) = &self.listener {
                listener.on_completed(run_id, records_written).await;
            }
        }
        PipelineExecution {
            run_id,
            outcome,
            records_written,
        }
    }
}

/// Check every required parameter, then return the input file location.
fn required_file_location(params: &JobParameters) -> Result<&str, PipelineError> {
    params.validate_required().map_err(|e| match e {
        CoreError::MissingParameter(key) => PipelineError::MissingParameter(key),
        other => PipelineError::MissingParameter(other.to_string()),
    })?;
    Ok(params.get(INPUT_FILE_LOCATION).unwrap_or_default())
}
