//! External workload descriptors and status.
//!
//! [`build_descriptor`] turns a static [`WorkloadTemplate`] plus the
//! per-run identity and parameters into an immutable
//! [`WorkloadDescriptor`]. It is pure: no I/O, same input gives the same
//! descriptor.

use std::collections::BTreeMap;

use crate::error::CoreError;
use crate::params::{JobParameters, INPUT_FILE_LOCATION};
use crate::types::RunId;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Environment variable that always carries the generated-file location.
pub const FILENAME_ENV: &str = "FILENAME";

/// Path inside the container where the shared claim is mounted.
pub const VOLUME_MOUNT_PATH: &str = "/test";

/// Name of the pod volume backed by the shared claim.
pub const VOLUME_NAME: &str = "test";

/// Label attached to the workload and its pod template.
pub const JOB_NAME_LABEL: &str = "job-name";

/// Kubernetes object names are DNS-1123 labels: at most 63 characters.
const MAX_NAME_LEN: usize = 63;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Restart policy of the workload's pod. The workload runs exactly once,
/// so `Never` is the only supported value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartPolicy {
    Never,
}

impl RestartPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Never => "Never",
        }
    }
}

/// A read-write mount of a persistent volume claim at [`VOLUME_MOUNT_PATH`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeBinding {
    pub claim_name: String,
}

impl VolumeBinding {
    pub fn new(claim_name: impl Into<String>) -> Self {
        Self {
            claim_name: claim_name.into(),
        }
    }

    pub fn mount_path(&self) -> &'static str {
        VOLUME_MOUNT_PATH
    }
}

/// Static part of a workload, fixed by configuration and reused across runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadTemplate {
    pub namespace: String,
    /// Prefix of the workload name; the run identity is appended.
    pub base_name: String,
    pub image: String,
    pub command: Vec<String>,
    pub volume: Option<VolumeBinding>,
}

/// Immutable description of one external workload.
///
/// Fields are private so a descriptor can only come out of
/// [`build_descriptor`] and never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadDescriptor {
    namespace: String,
    name: String,
    image: String,
    command: Vec<String>,
    env: BTreeMap<String, String>,
    volume: Option<VolumeBinding>,
    restart_policy: RestartPolicy,
}

impl WorkloadDescriptor {
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn command(&self) -> &[String] {
        &self.command
    }

    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    pub fn volume(&self) -> Option<&VolumeBinding> {
        self.volume.as_ref()
    }

    pub fn restart_policy(&self) -> RestartPolicy {
        self.restart_policy
    }
}

/// Status of an external workload as reported by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkloadStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl WorkloadStatus {
    /// Derive a status from the orchestrator's success and failure markers.
    ///
    /// A marker counts when it is present and positive. A failure marker
    /// wins over a success marker reported in the same snapshot.
    pub fn from_markers(succeeded: Option<i32>, failed: Option<i32>, active: Option<i32>) -> Self {
        let set = |m: Option<i32>| m.is_some_and(|n| n > 0);
        if set(failed) {
            Self::Failed
        } else if set(succeeded) {
            Self::Succeeded
        } else if set(active) {
            Self::Running
        } else {
            Self::Pending
        }
    }
}

impl std::fmt::Display for WorkloadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Naming
// ---------------------------------------------------------------------------

/// Derive the workload name for a run: `<base_name>-<run_id>`.
pub fn workload_name(base_name: &str, run_id: RunId) -> String {
    format!("{base_name}-{run_id}")
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Build the descriptor for one run.
///
/// Every parameter becomes an environment variable with the same name. The
/// value of [`INPUT_FILE_LOCATION`] is additionally injected as
/// [`FILENAME_ENV`], overriding any parameter of that name.
pub fn build_descriptor(
    run_id: RunId,
    template: &WorkloadTemplate,
    params: &JobParameters,
) -> Result<WorkloadDescriptor, CoreError> {
    if template.image.trim().is_empty() {
        return Err(CoreError::InvalidSpec(
            "image reference must not be empty".to_string(),
        ));
    }
    if template.command.is_empty() || template.command[0].trim().is_empty() {
        return Err(CoreError::InvalidSpec(
            "command must not be empty".to_string(),
        ));
    }
    if template.namespace.trim().is_empty() {
        return Err(CoreError::InvalidSpec(
            "namespace must not be empty".to_string(),
        ));
    }
    if let Some(volume) = &template.volume {
        if volume.claim_name.trim().is_empty() {
            return Err(CoreError::InvalidSpec(
                "volume claim name must not be empty".to_string(),
            ));
        }
    }

    let name = workload_name(&template.base_name, run_id);
    validate_workload_name(&template.base_name, &name)?;

    let mut env = BTreeMap::new();
    for (key, value) in params.iter() {
        validate_env_name(key)?;
        env.insert(key.to_string(), value.to_string());
    }
    let file_location = params
        .get(INPUT_FILE_LOCATION)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| {
            CoreError::InvalidSpec(format!("parameter '{INPUT_FILE_LOCATION}' is required"))
        })?;
    env.insert(FILENAME_ENV.to_string(), file_location.to_string());

    Ok(WorkloadDescriptor {
        namespace: template.namespace.clone(),
        name,
        image: template.image.clone(),
        command: template.command.clone(),
        env,
        volume: template.volume.clone(),
        restart_policy: RestartPolicy::Never,
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate the derived workload name.
///
/// Rules:
/// - Base name must not be empty and must start with a lowercase letter or digit.
/// - Only lowercase alphanumerics and hyphens.
/// - The full name must not exceed `MAX_NAME_LEN` characters.
fn validate_workload_name(base_name: &str, name: &str) -> Result<(), CoreError> {
    let Some(first) = base_name.chars().next() else {
        return Err(CoreError::InvalidSpec(
            "workload base name must not be empty".to_string(),
        ));
    };
    if !(first.is_ascii_lowercase() || first.is_ascii_digit()) {
        return Err(CoreError::InvalidSpec(format!(
            "workload base name '{base_name}' must start with a lowercase letter or digit"
        )));
    }
    if !base_name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(CoreError::InvalidSpec(format!(
            "workload base name '{base_name}' may only contain lowercase alphanumerics and hyphens"
        )));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(CoreError::InvalidSpec(format!(
            "workload name '{name}' exceeds {MAX_NAME_LEN} characters"
        )));
    }
    Ok(())
}

/// Environment variable names: non-empty, not starting with a digit, made
/// of alphanumerics, `_`, `-` and `.`.
fn validate_env_name(key: &str) -> Result<(), CoreError> {
    let valid = !key.is_empty()
        && !key.starts_with(|c: char| c.is_ascii_digit())
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(CoreError::InvalidSpec(format!(
            "malformed parameter key '{key}'"
        )))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
