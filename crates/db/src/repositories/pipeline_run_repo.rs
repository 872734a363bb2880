//! Repository for the `pipeline_runs` table.

use sqlx::PgPool;
use kbatch_core::outcome::PipelineOutcome;
use kbatch_core::types::DbId;

use crate::models::pipeline_run::PipelineRun;

/// Column list for `pipeline_runs` queries.
const COLUMNS: &str = "\
    id, pipeline_name, parameters, status, \
    started_at, completed_at, created_at, updated_at";

/// Provides query operations for pipeline run bookkeeping.
pub struct PipelineRunRepo;

impl PipelineRunRepo {
    /// Insert a new run in `running` status. The generated `id` is the
    /// run identity.
    pub async fn create(
        pool: &PgPool,
        pipeline_name: &str,
        parameters: &serde_json::Value,
    ) -> Result<PipelineRun, sqlx::Error> {
        let query = format!(
            "INSERT INTO pipeline_runs (pipeline_name, parameters) \
             VALUES ($1, $2) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PipelineRun>(&query)
            .bind(pipeline_name)
            .bind(parameters)
            .fetch_one(pool)
            .await
    }

    /// Set the final status and `completed_at`. Returns `false` if no row
    /// matched.
    pub async fn complete(
        pool: &PgPool,
        id: DbId,
        outcome: PipelineOutcome,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE pipeline_runs \
             SET status = $2, completed_at = NOW(), updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(outcome.as_str())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<PipelineRun>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM pipeline_runs WHERE id = $1");
        sqlx::query_as::<_, PipelineRun>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Most recent runs of a pipeline, newest first.
    pub async fn list_recent(
        pool: &PgPool,
        pipeline_name: &str,
        limit: i64,
    ) -> Result<Vec<PipelineRun>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM pipeline_runs \
             WHERE pipeline_name = $1 \
             ORDER BY id DESC LIMIT $2"
        );
        sqlx::query_as::<_, PipelineRun>(&query)
            .bind(pipeline_name)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
