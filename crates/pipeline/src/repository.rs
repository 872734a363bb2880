//! Run bookkeeping: identity allocation and outcome recording.

use async_trait::async_trait;
use kbatch_core::outcome::{PipelineOutcome, StepOutcome};
use kbatch_core::params::JobParameters;
use kbatch_core::types::RunId;
use kbatch_db::repositories::{PersonRepo, PipelineRunRepo, StepExecutionRepo};
use kbatch_db::DbPool;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Failed to serialize job parameters: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Pipeline run {0} not found")]
    RunNotFound(RunId),
}

/// Persistence collaborator of the orchestrator.
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Allocate a fresh run identity. Never returns the same value twice.
    async fn allocate_run_identity(
        &self,
        pipeline_name: &str,
        params: &JobParameters,
    ) -> Result<RunId, RepositoryError>;

    async fn record_step_outcome(
        &self,
        run_id: RunId,
        step_name: &str,
        outcome: StepOutcome,
        error: Option<&str>,
    ) -> Result<(), RepositoryError>;

    async fn record_pipeline_outcome(
        &self,
        run_id: RunId,
        outcome: PipelineOutcome,
    ) -> Result<(), RepositoryError>;
}

/// [`JobRepository`] over the `pipeline_runs` and `step_executions` tables.
#[derive(Clone)]
pub struct PgJobRepository {
    pool: DbPool,
}

impl PgJobRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobRepository for PgJobRepository {
    async fn allocate_run_identity(
        &self,
        pipeline_name: &str,
        params: &JobParameters,
    ) -> Result<RunId, RepositoryError> {
        let parameters = serde_json::to_value(params)?;
        let run = PipelineRunRepo::create(&self.pool, pipeline_name, &parameters).await?;
        Ok(run.run_id())
    }

    async fn record_step_outcome(
        &self,
        run_id: RunId,
        step_name: &str,
        outcome: StepOutcome,
        error: Option<&str>,
    ) -> Result<(), RepositoryError> {
        StepExecutionRepo::record(&self.pool, run_id.get(), step_name, outcome, error).await?;
        Ok(())
    }

    async fn record_pipeline_outcome(
        &self,
        run_id: RunId,
        outcome: PipelineOutcome,
    ) -> Result<(), RepositoryError> {
        if !PipelineRunRepo::complete(&self.pool, run_id.get(), outcome).await? {
            return Err(RepositoryError::RunNotFound(run_id));
        }
        Ok(())
    }
}

/// Hook invoked after a run completes successfully.
#[async_trait]
pub trait CompletionListener: Send + Sync {
    async fn on_completed(&self, run_id: RunId, records_written: u64);
}

/// Logs how many rows the target table holds after a successful run.
#[derive(Clone)]
pub struct RowCountListener {
    pool: DbPool,
}

impl RowCountListener {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CompletionListener for RowCountListener {
    async fn on_completed(&self, run_id: RunId, records_written: u64) {
        match PersonRepo::count(&self.pool).await {
            Ok(total) => tracing::info!(
                run_id = %run_id,
                records_written,
                total_rows = total,
                "Pipeline completed, people table verified",
            ),
            Err(e) => tracing::warn!(
                run_id = %run_id,
                error = %e,
                "Failed to count people rows after completion",
            ),
        }
    }
}
