//! Chunk writers for the load step.

use async_trait::async_trait;
use kbatch_core::record::PersonRecord;
use kbatch_db::repositories::PersonRepo;
use kbatch_db::DbPool;

/// Persists one chunk of records atomically.
#[async_trait]
pub trait RecordWriter: Send + Sync {
    /// Write `records` and return the number of rows written.
    async fn write_chunk(&self, records: &[PersonRecord]) -> Result<u64, sqlx::Error>;
}

/// Writes each chunk with one multi-row insert inside its own transaction.
#[derive(Clone)]
pub struct PgRecordWriter {
    pool: DbPool,
}

impl PgRecordWriter {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordWriter for PgRecordWriter {
    async fn write_chunk(&self, records: &[PersonRecord]) -> Result<u64, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let written = PersonRepo::insert_batch(&mut tx, records).await?;
        tx.commit().await?;
        Ok(written)
    }
}
