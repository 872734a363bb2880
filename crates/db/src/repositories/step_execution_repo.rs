//! Repository for the `step_executions` table.

use sqlx::PgPool;
use kbatch_core::outcome::StepOutcome;
use kbatch_core::types::DbId;

use crate::models::step_execution::StepExecution;

const COLUMNS: &str = "\
    id, run_id, step_name, status, error_message, completed_at, created_at";

pub struct StepExecutionRepo;

impl StepExecutionRepo {
    /// Record the outcome of one step. A second record for the same
    /// `(run_id, step_name)` overwrites the first.
    pub async fn record(
        pool: &PgPool,
        run_id: DbId,
        step_name: &str,
        outcome: StepOutcome,
        error_message: Option<&str>,
    ) -> Result<StepExecution, sqlx::Error> {
        let query = format!(
            "INSERT INTO step_executions (run_id, step_name, status, error_message) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (run_id, step_name) DO UPDATE \
             SET status = EXCLUDED.status, \
                 error_message = EXCLUDED.error_message, \
                 completed_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, StepExecution>(&query)
            .bind(run_id)
            .bind(step_name)
            .bind(outcome.as_str())
            .bind(error_message)
            .fetch_one(pool)
            .await
    }

    /// All step records of a run, in recording order.
    pub async fn list_for_run(
        pool: &PgPool,
        run_id: DbId,
    ) -> Result<Vec<StepExecution>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM step_executions WHERE run_id = $1 ORDER BY id"
        );
        sqlx::query_as::<_, StepExecution>(&query)
            .bind(run_id)
            .fetch_all(pool)
            .await
    }
}
