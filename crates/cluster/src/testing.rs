//! Test utilities: a scripted in-memory [`ClusterWorkloadClient`].

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use kbatch_core::workload::WorkloadDescriptor;
use tokio::sync::mpsc;

use crate::client::{ClusterError, ClusterWorkloadClient, StatusStream};
use crate::events::{StatusEvent, StatusSnapshot};

/// Behaviour of one `watch()` call.
pub enum WatchScript {
    /// Yield these events, then close.
    Events(Vec<StatusEvent>),
    /// Fail to open.
    OpenError(ClusterError),
    /// Forward whatever the test sends; close when the sender is dropped.
    Channel(mpsc::UnboundedReceiver<Result<StatusEvent, ClusterError>>),
    /// Stay open forever without events.
    Silent,
}

struct FakeState {
    submit_error: Option<ClusterError>,
    submitted: Vec<WorkloadDescriptor>,
    scripts: VecDeque<WatchScript>,
    watch_calls: usize,
    status: Option<StatusSnapshot>,
    status_calls: usize,
}

/// Fake cluster that records submissions and plays back scripted watches.
///
/// Each `watch()` call consumes the next [`WatchScript`]; once the scripts
/// run out, subscriptions stay silent. `status()` returns the configured
/// snapshot (`Pending` by default, `None` meaning "not found").
pub struct FakeWorkloadClient {
    state: Mutex<FakeState>,
}

impl Default for FakeWorkloadClient {
    fn default() -> Self {
        Self {
            state: Mutex::new(FakeState {
                submit_error: None,
                submitted: Vec::new(),
                scripts: VecDeque::new(),
                watch_calls: 0,
                status: Some(StatusSnapshot::default()),
                status_calls: 0,
            }),
        }
    }
}

impl FakeWorkloadClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cluster whose workload runs and then succeeds.
    pub fn succeeding() -> Self {
        Self::new().with_watch(WatchScript::Events(vec![
            StatusEvent::modified(StatusSnapshot::running()),
            StatusEvent::modified(StatusSnapshot::succeeded()),
        ]))
    }

    /// A cluster whose workload runs and then fails.
    pub fn failing() -> Self {
        Self::new().with_watch(WatchScript::Events(vec![
            StatusEvent::modified(StatusSnapshot::running()),
            StatusEvent::modified(StatusSnapshot::failed()),
        ]))
    }

    pub fn with_watch(self, script: WatchScript) -> Self {
        self.lock().scripts.push_back(script);
        self
    }

    pub fn with_status(self, status: Option<StatusSnapshot>) -> Self {
        self.lock().status = status;
        self
    }

    pub fn with_submit_error(self, err: ClusterError) -> Self {
        self.lock().submit_error = Some(err);
        self
    }

    /// Create a channel-backed subscription script and its sender.
    pub fn channel() -> (
        mpsc::UnboundedSender<Result<StatusEvent, ClusterError>>,
        WatchScript,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, WatchScript::Channel(rx))
    }

    pub fn submitted(&self) -> Vec<WorkloadDescriptor> {
        self.lock().submitted.clone()
    }

    pub fn watch_calls(&self) -> usize {
        self.lock().watch_calls
    }

    pub fn status_calls(&self) -> usize {
        self.lock().status_calls
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ClusterWorkloadClient for FakeWorkloadClient {
    async fn submit(&self, descriptor: &WorkloadDescriptor) -> Result<(), ClusterError> {
        let mut state = self.lock();
        if let Some(err) = state.submit_error.clone() {
            return Err(err);
        }
        state.submitted.push(descriptor.clone());
        Ok(())
    }

    async fn watch(&self, _namespace: &str, _name: &str) -> Result<StatusStream, ClusterError> {
        let script = {
            let mut state = self.lock();
            state.watch_calls += 1;
            state.scripts.pop_front().unwrap_or(WatchScript::Silent)
        };

        match script {
            WatchScript::Events(events) => Ok(stream::iter(events.into_iter().map(Ok)).boxed()),
            WatchScript::OpenError(err) => Err(err),
            WatchScript::Channel(rx) => Ok(stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|item| (item, rx))
            })
            .boxed()),
            WatchScript::Silent => Ok(stream::pending().boxed()),
        }
    }

    async fn status(
        &self,
        _namespace: &str,
        _name: &str,
    ) -> Result<Option<StatusSnapshot>, ClusterError> {
        let mut state = self.lock();
        state.status_calls += 1;
        Ok(state.status)
    }
}
