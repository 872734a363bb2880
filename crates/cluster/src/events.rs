//! Status events delivered by a workload subscription.
//!
//! The Kubernetes watch API reports `ADDED`, `MODIFIED` and `DELETED`
//! notifications, each carrying the object's current status counters.
//! [`StatusEvent`] keeps only what completion tracking needs.

use kbatch_core::workload::WorkloadStatus;

/// Kind of change the orchestrator reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Initial state of an existing object, or a newly created one.
    Added,
    Modified,
    Deleted,
}

/// Success, failure and activity markers of a workload at one instant.
///
/// Counters are pod counts as reported by the Job controller; an absent
/// counter means the controller has not set it yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub succeeded: Option<i32>,
    pub failed: Option<i32>,
    pub active: Option<i32>,
}

impl StatusSnapshot {
    pub fn succeeded() -> Self {
        Self {
            succeeded: Some(1),
            ..Default::default()
        }
    }

    pub fn failed() -> Self {
        Self {
            failed: Some(1),
            ..Default::default()
        }
    }

    pub fn running() -> Self {
        Self {
            active: Some(1),
            ..Default::default()
        }
    }

    /// Status derived from the markers; failure dominates success.
    pub fn status(&self) -> WorkloadStatus {
        WorkloadStatus::from_markers(self.succeeded, self.failed, self.active)
    }
}

/// One notification from a status subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEvent {
    pub kind: EventKind,
    pub snapshot: StatusSnapshot,
}

impl StatusEvent {
    pub fn modified(snapshot: StatusSnapshot) -> Self {
        Self {
            kind: EventKind::Modified,
            snapshot,
        }
    }
}
