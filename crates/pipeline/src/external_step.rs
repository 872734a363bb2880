//! Pipeline step that runs one external workload to completion.

use std::sync::Arc;
use std::time::Duration;

use kbatch_cluster::client::{ClusterError, ClusterWorkloadClient};
use kbatch_cluster::reconnect::ReconnectConfig;
use kbatch_cluster::watcher::{CompletionWatcher, TerminalStatus, WatchError};
use kbatch_core::error::CoreError;
use kbatch_core::outcome::StepOutcome;
use kbatch_core::params::JobParameters;
use kbatch_core::types::RunId;
use kbatch_core::workload::{build_descriptor, WorkloadTemplate};
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

/// Why the step could not produce an outcome.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error(transparent)]
    InvalidSpec(CoreError),

    #[error("Workload submission failed: {0}")]
    SubmissionFailed(#[source] ClusterError),

    #[error(transparent)]
    WatchLost(#[from] WatchError),

    #[error("Workload {workload} did not finish within {timeout:?}")]
    TimedOut { workload: String, timeout: Duration },

    #[error("Step cancelled")]
    Cancelled,
}

/// Submits a workload built from a fixed template and waits for it.
///
/// Workloads left behind by a timeout or cancellation keep running on the
/// cluster; nothing here deletes them.
pub struct ExternalJobStep {
    client: Arc<dyn ClusterWorkloadClient>,
    template: WorkloadTemplate,
    reconnect: ReconnectConfig,
}

impl ExternalJobStep {
    pub fn new(
        client: Arc<dyn ClusterWorkloadClient>,
        template: WorkloadTemplate,
        reconnect: ReconnectConfig,
    ) -> Self {
        Self {
            client,
            template,
            reconnect,
        }
    }

    /// Build, submit and watch the workload for `run_id`.
    ///
    /// `timeout` covers submission and watching together. The watcher task
    /// is released before this returns, whichever way it returns.
    pub async fn run(
        &self,
        run_id: RunId,
        params: &JobParameters,
        cancel: &CancellationToken,
        timeout: Duration,
    ) -> Result<StepOutcome, StepError> {
        let descriptor =
            build_descriptor(run_id, &self.template, params).map_err(StepError::InvalidSpec)?;
        let workload = descriptor.name().to_string();
        let deadline = Instant::now() + timeout;
        let timed_out = || StepError::TimedOut {
            workload: workload.clone(),
            timeout,
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(StepError::Cancelled),
            _ = sleep_until(deadline) => return Err(timed_out()),
            submitted = self.client.submit(&descriptor) => {
                submitted.map_err(StepError::SubmissionFailed)?;
            }
        }
        tracing::info!(
            run_id = %run_id,
            namespace = descriptor.namespace(),
            workload = %workload,
            "Workload submitted, waiting for completion",
        );

        let mut handle = CompletionWatcher::new(
            Arc::clone(&self.client),
            descriptor.namespace(),
            workload.as_str(),
            self.reconnect.clone(),
        )
        .spawn(cancel);

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(StepError::Cancelled),
            _ = sleep_until(deadline) => Err(timed_out()),
            outcome = handle.outcome() => match outcome {
                Ok(TerminalStatus::Succeeded) => Ok(StepOutcome::Completed),
                Ok(TerminalStatus::Failed) => Ok(StepOutcome::Failed),
                Err(e) => Err(StepError::WatchLost(e)),
            },
        };
        handle.release();

        match &result {
            Ok(outcome) => {
                tracing::info!(run_id = %run_id, workload = %workload, %outcome, "Workload finished");
            }
            Err(e) => {
                tracing::warn!(run_id = %run_id, workload = %workload, error = %e, "Workload step aborted");
            }
        }
        result
    }
}
