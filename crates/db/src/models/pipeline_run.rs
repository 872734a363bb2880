//! Pipeline run entity model.

use kbatch_core::types::{DbId, RunId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `pipeline_runs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PipelineRun {
    pub id: DbId,
    pub pipeline_name: String,
    pub parameters: serde_json::Value,
    pub status: String,
    pub started_at: Timestamp,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl PipelineRun {
    pub fn run_id(&self) -> RunId {
        RunId(self.id)
    }
}
