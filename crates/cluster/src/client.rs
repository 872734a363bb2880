//! Capability interface over the cluster control plane.
//!
//! [`ClusterWorkloadClient`] is injected into the external job step as an
//! `Arc<dyn ClusterWorkloadClient>`. Production code uses
//! [`KubeWorkloadClient`](crate::kubernetes::KubeWorkloadClient); tests
//! substitute a fake.

use async_trait::async_trait;
use futures::stream::BoxStream;
use kbatch_core::workload::WorkloadDescriptor;

use crate::events::{StatusEvent, StatusSnapshot};

/// A live subscription to status changes of one workload.
///
/// Dropping the stream releases the subscription.
pub type StatusStream = BoxStream<'static, Result<StatusEvent, ClusterError>>;

#[async_trait]
pub trait ClusterWorkloadClient: Send + Sync {
    /// Create the workload described by `descriptor`.
    async fn submit(&self, descriptor: &WorkloadDescriptor) -> Result<(), ClusterError>;

    /// Open a status-change subscription for the named workload.
    ///
    /// The stream ends when the subscription closes, for whatever reason.
    async fn watch(&self, namespace: &str, name: &str) -> Result<StatusStream, ClusterError>;

    /// Read the current status of the named workload once.
    ///
    /// Returns `Ok(None)` if the workload does not exist.
    async fn status(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<StatusSnapshot>, ClusterError>;
}

/// Errors that can occur when talking to the cluster.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClusterError {
    /// The control plane could not be reached or failed internally.
    #[error("Cluster unavailable: {0}")]
    Unavailable(String),

    /// The control plane refused the request (quota, validation, conflict).
    #[error("Cluster rejected request ({code}): {message}")]
    Rejected {
        /// HTTP status code returned by the API server.
        code: u16,
        message: String,
    },
}
