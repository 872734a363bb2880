//! Shared fakes for pipeline integration tests.

#![allow(dead_code)]

use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use kbatch_cluster::reconnect::ReconnectConfig;
use kbatch_core::outcome::{PipelineOutcome, StepOutcome};
use kbatch_core::params::{JobParameters, INPUT_FILE_LOCATION};
use kbatch_core::record::PersonRecord;
use kbatch_core::types::RunId;
use kbatch_core::workload::WorkloadTemplate;
use kbatch_pipeline::load::writer::RecordWriter;
use kbatch_pipeline::repository::{CompletionListener, JobRepository, RepositoryError};
use tempfile::NamedTempFile;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn template() -> WorkloadTemplate {
    WorkloadTemplate {
        namespace: "batch".into(),
        base_name: "generate-csv".into(),
        image: "registry.access.redhat.com/rhel7/rhel:latest".into(),
        command: vec![
            "/bin/bash".into(),
            "-c".into(),
            "echo Jane,Doe > $FILENAME".into(),
        ],
        volume: None,
    }
}

pub fn fast_reconnect(max_attempts: u32) -> ReconnectConfig {
    ReconnectConfig {
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        multiplier: 2.0,
        max_attempts,
    }
}

/// Write `lines` to a temp file, one per line.
pub fn input_file(lines: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{line}").unwrap();
    }
    file.flush().unwrap();
    file
}

pub fn params_for(file: &NamedTempFile) -> JobParameters {
    JobParameters::new().with(INPUT_FILE_LOCATION, file.path().to_string_lossy())
}

// ---------------------------------------------------------------------------
// In-memory job repository
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedStep {
    pub run_id: RunId,
    pub step_name: String,
    pub outcome: StepOutcome,
    pub error: Option<String>,
}

#[derive(Default)]
struct RepoState {
    next_id: i64,
    allocated: Vec<(RunId, JobParameters)>,
    steps: Vec<RecordedStep>,
    outcomes: Vec<(RunId, PipelineOutcome)>,
}

#[derive(Default)]
pub struct InMemoryJobRepository {
    state: Mutex<RepoState>,
    fail_recording: bool,
}

impl InMemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocation works, every record call fails.
    pub fn failing_to_record() -> Self {
        Self {
            fail_recording: true,
            ..Self::default()
        }
    }

    pub fn allocated(&self) -> Vec<RunId> {
        self.state.lock().unwrap().allocated.iter().map(|(id, _)| *id).collect()
    }

    pub fn steps(&self) -> Vec<RecordedStep> {
        self.state.lock().unwrap().steps.clone()
    }

    pub fn outcomes(&self) -> Vec<(RunId, PipelineOutcome)> {
        self.state.lock().unwrap().outcomes.clone()
    }
}

#[async_trait]
impl JobRepository for InMemoryJobRepository {
    async fn allocate_run_identity(
        &self,
        _pipeline_name: &str,
        params: &JobParameters,
    ) -> Result<RunId, RepositoryError> {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = RunId(state.next_id);
        state.allocated.push((id, params.clone()));
        Ok(id)
    }

    async fn record_step_outcome(
        &self,
        run_id: RunId,
        step_name: &str,
        outcome: StepOutcome,
        error: Option<&str>,
    ) -> Result<(), RepositoryError> {
        if self.fail_recording {
            return Err(RepositoryError::Database(sqlx::Error::PoolClosed));
        }
        self.state.lock().unwrap().steps.push(RecordedStep {
            run_id,
            step_name: step_name.to_string(),
            outcome,
            error: error.map(str::to_string),
        });
        Ok(())
    }

    async fn record_pipeline_outcome(
        &self,
        run_id: RunId,
        outcome: PipelineOutcome,
    ) -> Result<(), RepositoryError> {
        if self.fail_recording {
            return Err(RepositoryError::Database(sqlx::Error::PoolClosed));
        }
        self.state.lock().unwrap().outcomes.push((run_id, outcome));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Recording writer
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingWriter {
    chunks: Mutex<Vec<Vec<PersonRecord>>>,
    fail_on_chunk: Option<usize>,
}

impl RecordingWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail when asked to write the chunk with this 1-based index.
    pub fn failing_on(chunk: usize) -> Self {
        Self {
            fail_on_chunk: Some(chunk),
            ..Self::default()
        }
    }

    pub fn chunks(&self) -> Vec<Vec<PersonRecord>> {
        self.chunks.lock().unwrap().clone()
    }

    pub fn records(&self) -> Vec<PersonRecord> {
        self.chunks().into_iter().flatten().collect()
    }
}

#[async_trait]
impl RecordWriter for RecordingWriter {
    async fn write_chunk(&self, records: &[PersonRecord]) -> Result<u64, sqlx::Error> {
        let mut chunks = self.chunks.lock().unwrap();
        if self.fail_on_chunk == Some(chunks.len() + 1) {
            return Err(sqlx::Error::Protocol("insert rejected".into()));
        }
        chunks.push(records.to_vec());
        Ok(records.len() as u64)
    }
}

// ---------------------------------------------------------------------------
// Recording listener
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingListener {
    calls: Mutex<Vec<(RunId, u64)>>,
}

impl RecordingListener {
    pub fn calls(&self) -> Vec<(RunId, u64)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionListener for RecordingListener {
    async fn on_completed(&self, run_id: RunId, records_written: u64) {
        self.calls.lock().unwrap().push((run_id, records_written));
    }
}
