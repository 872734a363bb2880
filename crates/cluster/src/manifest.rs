//! Render a [`WorkloadDescriptor`] as a Kubernetes `batch/v1` Job.

use std::collections::BTreeMap;

use k8s_openapi::api::batch::v1::{Job, JobSpec};
use k8s_openapi::api::core::v1::{
    Container, EnvVar, PersistentVolumeClaimVolumeSource, PodSpec, PodTemplateSpec, Volume,
    VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kbatch_core::workload::{WorkloadDescriptor, JOB_NAME_LABEL, VOLUME_NAME};

/// The Job controller must not retry a failed pod: one failure is the
/// terminal failure of the workload.
const BACKOFF_LIMIT: i32 = 0;

/// Build the Job manifest for a descriptor.
///
/// The Job and its pod template both carry the `job-name` label. The single
/// container is named after the workload.
pub fn build_job(descriptor: &WorkloadDescriptor) -> Job {
    let labels = BTreeMap::from([(
        JOB_NAME_LABEL.to_string(),
        descriptor.name().to_string(),
    )]);

    let env: Vec<EnvVar> = descriptor
        .env()
        .iter()
        .map(|(name, value)| EnvVar {
            name: name.clone(),
            value: Some(value.clone()),
            ..Default::default()
        })
        .collect();

    let (volume_mounts, volumes) = match descriptor.volume() {
        Some(binding) => (
            Some(vec![VolumeMount {
                name: VOLUME_NAME.to_string(),
                mount_path: binding.mount_path().to_string(),
                read_only: Some(false),
                ..Default::default()
            }]),
            Some(vec![Volume {
                name: VOLUME_NAME.to_string(),
                persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
                    claim_name: binding.claim_name.clone(),
                    read_only: Some(false),
                }),
                ..Default::default()
            }]),
        ),
        None => (None, None),
    };

    let container = Container {
        name: descriptor.name().to_string(),
        image: Some(descriptor.image().to_string()),
        command: Some(descriptor.command().to_vec()),
        env: (!env.is_empty()).then_some(env),
        volume_mounts,
        ..Default::default()
    };

    Job {
        metadata: ObjectMeta {
            name: Some(descriptor.name().to_string()),
            namespace: Some(descriptor.namespace().to_string()),
            labels: Some(labels.clone()),
            ..Default::default()
        },
        spec: Some(JobSpec {
            backoff_limit: Some(BACKOFF_LIMIT),
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    restart_policy: Some(descriptor.restart_policy().as_str().to_string()),
                    containers: vec![container],
                    volumes,
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}
