//! [`ClusterWorkloadClient`] backed by the Kubernetes API.
//!
//! Workloads are `batch/v1` Jobs. Subscriptions use the watch API with a
//! field selector on `metadata.name`, starting from resource version `"0"`
//! so the first notification reflects the Job's current state.

use async_trait::async_trait;
use futures::{future, StreamExt};
use k8s_openapi::api::batch::v1::Job;
use kbatch_core::workload::WorkloadDescriptor;
use kube::api::{Api, PostParams, WatchEvent, WatchParams};
use kube::Client;

use crate::client::{ClusterError, ClusterWorkloadClient, StatusStream};
use crate::events::{EventKind, StatusEvent, StatusSnapshot};
use crate::manifest::build_job;

/// Server-side timeout for a single watch request, in seconds.
///
/// Kept below the API server's own limit; the watcher re-opens the
/// subscription when it expires.
const WATCH_TIMEOUT_SECS: u32 = 290;

/// Kubernetes-backed workload client.
#[derive(Clone)]
pub struct KubeWorkloadClient {
    client: Client,
}

impl KubeWorkloadClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the ambient kubeconfig or in-cluster service
    /// account.
    pub async fn try_default() -> Result<Self, ClusterError> {
        let client = Client::try_default().await.map_err(map_kube_error)?;
        Ok(Self::new(client))
    }

    fn jobs(&self, namespace: &str) -> Api<Job> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl ClusterWorkloadClient for KubeWorkloadClient {
    async fn submit(&self, descriptor: &WorkloadDescriptor) -> Result<(), ClusterError> {
        let job = build_job(descriptor);
        self.jobs(descriptor.namespace())
            .create(&PostParams::default(), &job)
            .await
            .map_err(map_kube_error)?;

        tracing::info!(
            namespace = descriptor.namespace(),
            workload = descriptor.name(),
            image = descriptor.image(),
            "Submitted Kubernetes job",
        );
        Ok(())
    }

    async fn watch(&self, namespace: &str, name: &str) -> Result<StatusStream, ClusterError> {
        let params = WatchParams::default()
            .fields(&format!("metadata.name={name}"))
            .timeout(WATCH_TIMEOUT_SECS);

        let stream = self
            .jobs(namespace)
            .watch(&params, "0")
            .await
            .map_err(map_kube_error)?;

        Ok(stream
            .filter_map(|item| {
                future::ready(match item {
                    Ok(event) => translate_event(event),
                    Err(e) => Some(Err(map_kube_error(e))),
                })
            })
            .boxed())
    }

    async fn status(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<StatusSnapshot>, ClusterError> {
        let job = self
            .jobs(namespace)
            .get_opt(name)
            .await
            .map_err(map_kube_error)?;
        Ok(job.as_ref().map(snapshot_of))
    }
}

// ---- private helpers ----

/// Convert a raw watch event into a [`StatusEvent`].
///
/// Bookmarks carry no status and are dropped. Error events become stream
/// errors, which end the current subscription.
fn translate_event(event: WatchEvent<Job>) -> Option<Result<StatusEvent, ClusterError>> {
    let (kind, job) = match event {
        WatchEvent::Added(job) => (EventKind::Added, job),
        WatchEvent::Modified(job) => (EventKind::Modified, job),
        WatchEvent::Deleted(job) => (EventKind::Deleted, job),
        WatchEvent::Bookmark(_) => return None,
        WatchEvent::Error(e) => {
            return Some(Err(ClusterError::Unavailable(format!(
                "watch error event: {e:?}"
            ))))
        }
    };
    Some(Ok(StatusEvent {
        kind,
        snapshot: snapshot_of(&job),
    }))
}

fn snapshot_of(job: &Job) -> StatusSnapshot {
    job.status
        .as_ref()
        .map(|s| StatusSnapshot {
            succeeded: s.succeeded,
            failed: s.failed,
            active: s.active,
        })
        .unwrap_or_default()
}

/// API responses in the 4xx range are rejections; everything else
/// (transport errors, 5xx) means the control plane is unavailable.
fn map_kube_error(err: kube::Error) -> ClusterError {
    match err {
        kube::Error::Api(response) if (400..500).contains(&response.code) => {
            ClusterError::Rejected {
                code: response.code,
                message: response.message,
            }
        }
        other => ClusterError::Unavailable(other.to_string()),
    }
}
