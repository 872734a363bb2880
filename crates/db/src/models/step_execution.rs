//! Step execution entity model.

use kbatch_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// Recorded outcome of one step of one pipeline run.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StepExecution {
    pub id: DbId,
    pub run_id: DbId,
    pub step_name: String,
    pub status: String,
    pub error_message: Option<String>,
    pub completed_at: Timestamp,
    pub created_at: Timestamp,
}
