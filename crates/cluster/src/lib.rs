//! Kubernetes workload submission and completion tracking.
//!
//! Provides the [`client::ClusterWorkloadClient`] capability trait, its
//! Kubernetes implementation, Job manifest rendering, reconnection
//! backoff, and the [`watcher::CompletionWatcher`] that reduces a status
//! event stream to a single terminal outcome.

pub mod client;
pub mod events;
pub mod kubernetes;
pub mod manifest;
pub mod reconnect;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod watcher;
