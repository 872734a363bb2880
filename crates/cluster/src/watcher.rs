//! Completion tracking for a single submitted workload.
//!
//! [`CompletionWatcher`] consumes a status subscription and reduces it to
//! one terminal outcome:
//!
//! ```text
//! Idle -> Watching -> { Succeeded, Failed, WatchClosed }
//! ```
//!
//! `WatchClosed` is not terminal for the caller. After a closure the
//! watcher reads the workload status once (fallback poll), then re-opens
//! the subscription with exponential backoff. Once the reconnect budget is
//! spent the watch is reported as [`WatchError::Lost`]. The budget resets
//! only when a subscription delivers a change after its initial `Added`
//! replay.
//!
//! [`CompletionWatcher::spawn`] runs the watcher on its own Tokio task and
//! hands the terminal outcome back through a oneshot channel, written
//! exactly once. The returned [`WatchHandle`] owns the task; dropping or
//! releasing it cancels the task, which drops the subscription.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::client::{ClusterWorkloadClient, StatusStream};
use crate::events::{EventKind, StatusSnapshot};
use crate::reconnect::{sleep_or_cancel, Backoff, ReconnectConfig};
use kbatch_core::workload::WorkloadStatus;

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// Terminal status of a watched workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalStatus {
    Succeeded,
    Failed,
}

/// Lifecycle of one watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    /// No subscription opened yet.
    Idle,
    /// Subscription open, no terminal status seen.
    Watching,
    Succeeded,
    Failed,
    /// Subscription ended without a terminal status.
    WatchClosed,
}

impl WatchState {
    /// Apply one status snapshot.
    ///
    /// A failure marker moves to `Failed` even when the same snapshot also
    /// reports success. Terminal states absorb every later snapshot.
    pub fn apply(self, snapshot: &StatusSnapshot) -> Self {
        match self {
            Self::Succeeded | Self::Failed => self,
            _ => match snapshot.status() {
                WorkloadStatus::Failed => Self::Failed,
                WorkloadStatus::Succeeded => Self::Succeeded,
                WorkloadStatus::Pending | WorkloadStatus::Running => Self::Watching,
            },
        }
    }

    pub fn terminal(self) -> Option<TerminalStatus> {
        match self {
            Self::Succeeded => Some(TerminalStatus::Succeeded),
            Self::Failed => Some(TerminalStatus::Failed),
            _ => None,
        }
    }
}

/// Errors surfaced by the watcher.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WatchError {
    /// Completion could not be determined.
    #[error("Watch lost for workload {workload} after {attempts} reconnect attempts: {reason}")]
    Lost {
        workload: String,
        attempts: u32,
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// CompletionWatcher
// ---------------------------------------------------------------------------

/// Watches one named workload until it reaches a terminal status.
pub struct CompletionWatcher {
    client: Arc<dyn ClusterWorkloadClient>,
    namespace: String,
    name: String,
    config: ReconnectConfig,
    state: WatchState,
}

/// Why a single subscription ended.
enum Closure {
    Terminal(TerminalStatus),
    Closed { made_progress: bool, reason: String },
}

impl CompletionWatcher {
    pub fn new(
        client: Arc<dyn ClusterWorkloadClient>,
        namespace: impl Into<String>,
        name: impl Into<String>,
        config: ReconnectConfig,
    ) -> Self {
        Self {
            client,
            namespace: namespace.into(),
            name: name.into(),
            config,
            state: WatchState::Idle,
        }
    }

    pub fn state(&self) -> WatchState {
        self.state
    }

    /// Watch until a terminal status, a lost watch, or cancellation.
    ///
    /// Returns `None` if `cancel` fired first. Every subscription opened
    /// here is dropped before this function returns.
    pub async fn run(
        &mut self,
        cancel: &CancellationToken,
    ) -> Option<Result<TerminalStatus, WatchError>> {
        let config = self.config.clone();
        let mut backoff = Backoff::new(&config);

        loop {
            let opened = tokio::select! {
                biased;
                _ = cancel.cancelled() => return None,
                result = self.client.watch(&self.namespace, &self.name) => result,
            };

            let reason = match opened {
                Ok(mut stream) => {
                    self.state = WatchState::Watching;
                    tracing::debug!(
                        namespace = %self.namespace,
                        workload = %self.name,
                        "Workload watch opened",
                    );
                    let closure = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return None,
                        closure = self.consume(&mut stream) => closure,
                    };
                    drop(stream);

                    match closure {
                        Closure::Terminal(status) => return Some(Ok(status)),
                        Closure::Closed {
                            made_progress,
                            reason,
                        } => {
                            if made_progress {
                                backoff.reset();
                            }
                            reason
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        namespace = %self.namespace,
                        workload = %self.name,
                        error = %e,
                        "Failed to open workload watch",
                    );
                    e.to_string()
                }
            };
            self.state = WatchState::WatchClosed;

            // Fallback poll: the terminal transition may have happened while
            // no subscription was open.
            let polled = tokio::select! {
                biased;
                _ = cancel.cancelled() => return None,
                result = self.client.status(&self.namespace, &self.name) => result,
            };
            match polled {
                Ok(Some(snapshot)) => {
                    let state = self.state.apply(&snapshot);
                    if let Some(status) = state.terminal() {
                        self.state = state;
                        tracing::info!(
                            workload = %self.name,
                            ?status,
                            "Terminal status found by fallback poll",
                        );
                        return Some(Ok(status));
                    }
                }
                Ok(None) => {
                    return Some(Err(self.lost(
                        backoff.attempts(),
                        "workload no longer exists".to_string(),
                    )));
                }
                Err(e) => {
                    tracing::warn!(
                        workload = %self.name,
                        error = %e,
                        "Fallback status poll failed",
                    );
                }
            }

            let Some(delay) = backoff.next_attempt() else {
                tracing::error!(
                    namespace = %self.namespace,
                    workload = %self.name,
                    attempts = backoff.attempts(),
                    reason = %reason,
                    "Reconnect budget exhausted",
                );
                return Some(Err(self.lost(backoff.attempts(), reason)));
            };

            tracing::info!(
                namespace = %self.namespace,
                workload = %self.name,
                attempt = backoff.attempts(),
                delay_ms = delay.as_millis() as u64,
                "Re-opening workload watch",
            );
            if !sleep_or_cancel(delay, cancel).await {
                return None;
            }
        }
    }

    /// Run the watcher on a separate task.
    ///
    /// The task stops when `parent` is cancelled or when the returned handle
    /// is released or dropped. Releasing the handle never cancels `parent`.
    pub fn spawn(mut self, parent: &CancellationToken) -> WatchHandle {
        let cancel = parent.child_token();
        let task_cancel = cancel.clone();
        let workload = self.name.clone();
        let (tx, rx) = oneshot::channel();

        let task = tokio::spawn(async move {
            if let Some(result) = self.run(&task_cancel).await {
                // The receiver is gone if the caller already timed out.
                let _ = tx.send(result);
            }
        });

        WatchHandle {
            outcome: rx,
            cancel,
            task: Some(task),
            workload,
        }
    }

    // ---- private helpers ----

    /// Read events from one subscription until it ends or a terminal
    /// status is observed.
    ///
    /// `made_progress` is set only by `Modified` or `Deleted` events, so a
    /// subscription that replays the initial state and then drops still
    /// counts against the reconnect budget.
    async fn consume(&mut self, stream: &mut StatusStream) -> Closure {
        let mut made_progress = false;

        while let Some(item) = stream.next().await {
            let event = match item {
                Ok(event) => event,
                Err(e) => {
                    return Closure::Closed {
                        made_progress,
                        reason: e.to_string(),
                    };
                }
            };
            // Every subscription opens with an ADDED replay of the current
            // state. Only later notifications are real changes.
            if event.kind != EventKind::Added {
                made_progress = true;
            }

            self.state = self.state.apply(&event.snapshot);
            tracing::debug!(
                workload = %self.name,
                kind = ?event.kind,
                status = %event.snapshot.status(),
                "Workload status event",
            );
            if let Some(status) = self.state.terminal() {
                return Closure::Terminal(status);
            }
            if event.kind == EventKind::Deleted {
                return Closure::Closed {
                    made_progress,
                    reason: "workload deleted before reaching a terminal status".to_string(),
                };
            }
        }

        Closure::Closed {
            made_progress,
            reason: "subscription closed".to_string(),
        }
    }

    fn lost(&self, attempts: u32, reason: String) -> WatchError {
        WatchError::Lost {
            workload: self.name.clone(),
            attempts,
            reason,
        }
    }
}

// ---------------------------------------------------------------------------
// WatchHandle
// ---------------------------------------------------------------------------

/// Owner of a spawned watcher task.
///
/// The subscription lives inside the task, so releasing the handle is what
/// releases the subscription. [`Drop`] releases it too, covering every exit
/// path of the caller.
pub struct WatchHandle {
    outcome: oneshot::Receiver<Result<TerminalStatus, WatchError>>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
    workload: String,
}

impl WatchHandle {
    /// Wait for the terminal outcome.
    ///
    /// Resolves to [`WatchError::Lost`] if the task stopped without
    /// producing one (it was cancelled or panicked).
    pub async fn outcome(&mut self) -> Result<TerminalStatus, WatchError> {
        match (&mut self.outcome).await {
            Ok(result) => result,
            Err(_) => Err(WatchError::Lost {
                workload: self.workload.clone(),
                attempts: 0,
                reason: "watcher task stopped without an outcome".to_string(),
            }),
        }
    }

    /// Stop the watcher task and drop its subscription. Idempotent.
    pub fn release(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!(workload = %self.workload, "Workload watch released");
        }
    }

    pub fn is_released(&self) -> bool {
        self.task.is_none()
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.release();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
