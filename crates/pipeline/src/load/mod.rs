//! Chunked load of the generated file into the `people` table.
//!
//! Records flow reader -> processor -> writer. The writer is called once
//! per full chunk and once more for a trailing partial chunk; cancellation
//! is observed between chunks, never in the middle of one.

pub mod processor;
pub mod reader;
pub mod writer;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use kbatch_core::record::PersonRecord;
use tokio_util::sync::CancellationToken;

use self::reader::RecordReader;
use self::writer::RecordWriter;

/// Records per chunk when none is configured.
pub const DEFAULT_CHUNK_SIZE: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed record on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Failed to write chunk: {0}")]
    Write(#[from] sqlx::Error),

    #[error("Load cancelled")]
    Cancelled,
}

/// Counters for one completed load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub records_read: u64,
    pub records_written: u64,
    pub chunks: u64,
}

pub struct ChunkedLoadStep {
    writer: Arc<dyn RecordWriter>,
    chunk_size: usize,
}

impl ChunkedLoadStep {
    /// A chunk size of zero is treated as one.
    pub fn new(writer: Arc<dyn RecordWriter>, chunk_size: usize) -> Self {
        Self {
            writer,
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub async fn run(
        &self,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<LoadSummary, LoadError> {
        let mut reader = RecordReader::open(path).await?;
        let mut chunk: Vec<PersonRecord> = Vec::with_capacity(self.chunk_size);
        let mut summary = LoadSummary::default();

        while let Some(record) = reader.next_record().await? {
            summary.records_read += 1;
            chunk.push(processor::process(record));
            if chunk.len() == self.chunk_size {
                self.flush(&mut chunk, &mut summary, cancel).await?;
            }
        }
        if !chunk.is_empty() {
            self.flush(&mut chunk, &mut summary, cancel).await?;
        }

        tracing::info!(
            path = %path.display(),
            records_read = summary.records_read,
            records_written = summary.records_written,
            chunks = summary.chunks,
            "Load step finished",
        );
        Ok(summary)
    }

    async fn flush(
        &self,
        chunk: &mut Vec<PersonRecord>,
        summary: &mut LoadSummary,
        cancel: &CancellationToken,
    ) -> Result<(), LoadError> {
        if cancel.is_cancelled() {
            return Err(LoadError::Cancelled);
        }
        let written = self.writer.write_chunk(chunk).await?;
        summary.records_written += written;
        summary.chunks += 1;
        tracing::debug!(chunk = summary.chunks, written, "Chunk committed");
        chunk.clear();
        Ok(())
    }
}
