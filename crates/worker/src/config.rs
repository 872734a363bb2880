use std::time::Duration;

use kbatch_cluster::reconnect::ReconnectConfig;
use kbatch_core::workload::{VolumeBinding, WorkloadTemplate};
use kbatch_db::repositories::person_repo::MAX_BATCH_ROWS;
use kbatch_pipeline::load::DEFAULT_CHUNK_SIZE;

use crate::logging::LogFormat;

pub const DEFAULT_NAMESPACE: &str = "default";
pub const DEFAULT_WORKLOAD_NAME: &str = "generate-csv";
pub const DEFAULT_WORKLOAD_IMAGE: &str = "registry.access.redhat.com/rhel7/rhel:latest";
pub const DEFAULT_WORKLOAD_COMMAND: &str =
    r#"printf 'Jill,Doe\nJoe,Doe\nJustin,Doe\nJane,Doe\nJohn,Doe\n' > "$FILENAME""#;
pub const DEFAULT_STEP_TIMEOUT_SECS: u64 = 1800;
pub const DEFAULT_RECONNECT_ATTEMPTS: u32 = 5;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has invalid value '{value}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Worker configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    pub namespace: String,
    /// Persistent volume claim mounted into the workload, if any.
    pub pvc_claim: Option<String>,
    pub workload_name: String,
    pub workload_image: String,
    /// Shell snippet, run with `/bin/bash -c`.
    pub workload_command: String,
    pub step_timeout: Duration,
    pub reconnect_attempts: u32,
    pub chunk_size: usize,
    pub log_format: LogFormat,
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                           | Default                                         |
    /// |-----------------------------------|-------------------------------------------------|
    /// | `DATABASE_URL`                    | required                                        |
    /// | `KBATCH_NAMESPACE`                | `default`                                       |
    /// | `KBATCH_PVC_CLAIM`                | unset (no volume)                               |
    /// | `KBATCH_WORKLOAD_NAME`            | `generate-csv`                                  |
    /// | `KBATCH_WORKLOAD_IMAGE`           | `registry.access.redhat.com/rhel7/rhel:latest`  |
    /// | `KBATCH_WORKLOAD_COMMAND`         | writes five sample names to `$FILENAME`         |
    /// | `KBATCH_STEP_TIMEOUT_SECS`        | `1800`                                          |
    /// | `KBATCH_WATCH_RECONNECT_ATTEMPTS` | `5`                                             |
    /// | `KBATCH_CHUNK_SIZE`               | `10`                                            |
    /// | `LOG_FORMAT`                      | `text`                                          |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup. Blank
    /// values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let step_timeout_secs: u64 = parse_or(
            "KBATCH_STEP_TIMEOUT_SECS",
            get("KBATCH_STEP_TIMEOUT_SECS"),
            DEFAULT_STEP_TIMEOUT_SECS,
        )?;
        if step_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "KBATCH_STEP_TIMEOUT_SECS",
                value: "0".into(),
                reason: "must be greater than zero".into(),
            });
        }

        let chunk_size: usize = parse_or(
            "KBATCH_CHUNK_SIZE",
            get("KBATCH_CHUNK_SIZE"),
            DEFAULT_CHUNK_SIZE,
        )?;
        if chunk_size == 0 || chunk_size > MAX_BATCH_ROWS {
            return Err(ConfigError::Invalid {
                name: "KBATCH_CHUNK_SIZE",
                value: chunk_size.to_string(),
                reason: format!("must be between 1 and {MAX_BATCH_ROWS}"),
            });
        }

        let log_format = match get("LOG_FORMAT") {
            None => LogFormat::Text,
            Some(value) => value.parse::<LogFormat>().map_err(|reason| ConfigError::Invalid {
                name: "LOG_FORMAT",
                value,
                reason,
            })?,
        };

        Ok(Self {
            database_url,
            namespace: get("KBATCH_NAMESPACE").unwrap_or_else(|| DEFAULT_NAMESPACE.into()),
            pvc_claim: get("KBATCH_PVC_CLAIM"),
            workload_name: get("KBATCH_WORKLOAD_NAME")
                .unwrap_or_else(|| DEFAULT_WORKLOAD_NAME.into()),
            workload_image: get("KBATCH_WORKLOAD_IMAGE")
                .unwrap_or_else(|| DEFAULT_WORKLOAD_IMAGE.into()),
            workload_command: get("KBATCH_WORKLOAD_COMMAND")
                .unwrap_or_else(|| DEFAULT_WORKLOAD_COMMAND.into()),
            step_timeout: Duration::from_secs(step_timeout_secs),
            reconnect_attempts: parse_or(
                "KBATCH_WATCH_RECONNECT_ATTEMPTS",
                get("KBATCH_WATCH_RECONNECT_ATTEMPTS"),
                DEFAULT_RECONNECT_ATTEMPTS,
            )?,
            chunk_size,
            log_format,
        })
    }

    /// Static part of the workload submitted on every run.
    pub fn workload_template(&self) -> WorkloadTemplate {
        WorkloadTemplate {
            namespace: self.namespace.clone(),
            base_name: self.workload_name.clone(),
            image: self.workload_image.clone(),
            command: vec![
                "/bin/bash".into(),
                "-c".into(),
                self.workload_command.clone(),
            ],
            volume: self.pvc_claim.as_deref().map(VolumeBinding::new),
        }
    }

    pub fn reconnect(&self) -> ReconnectConfig {
        ReconnectConfig {
            max_attempts: self.reconnect_attempts,
            ..ReconnectConfig::default()
        }
    }
}

fn parse_or<T>(name: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
            value,
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<WorkerConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        WorkerConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_only_database_url_set() {
        let config = load(&[("DATABASE_URL", "postgres://localhost/kbatch")]).unwrap();

        assert_eq!(config.namespace, "default");
        assert_eq!(config.workload_name, "generate-csv");
        assert_eq!(config.workload_image, DEFAULT_WORKLOAD_IMAGE);
        assert_eq!(config.step_timeout, Duration::from_secs(1800));
        assert_eq!(config.reconnect_attempts, 5);
        assert_eq!(config.chunk_size, 10);
        assert_eq!(config.log_format, LogFormat::Text);
        assert!(config.pvc_claim.is_none());
    }

    #[test]
    fn database_url_is_required() {
        assert_eq!(load(&[]).unwrap_err(), ConfigError::Missing("DATABASE_URL"));
        assert_eq!(
            load(&[("DATABASE_URL", "  ")]).unwrap_err(),
            ConfigError::Missing("DATABASE_URL")
        );
    }

    #[test]
    fn overrides_are_read() {
        let config = load(&[
            ("DATABASE_URL", "postgres://db/kbatch"),
            ("KBATCH_NAMESPACE", "batch"),
            ("KBATCH_PVC_CLAIM", "shared-data"),
            ("KBATCH_STEP_TIMEOUT_SECS", "60"),
            ("KBATCH_WATCH_RECONNECT_ATTEMPTS", "2"),
            ("KBATCH_CHUNK_SIZE", "25"),
            ("LOG_FORMAT", "json"),
        ])
        .unwrap();

        assert_eq!(config.namespace, "batch");
        assert_eq!(config.pvc_claim.as_deref(), Some("shared-data"));
        assert_eq!(config.step_timeout, Duration::from_secs(60));
        assert_eq!(config.reconnect().max_attempts, 2);
        assert_eq!(config.chunk_size, 25);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn non_numeric_timeout_is_rejected() {
        let err = load(&[
            ("DATABASE_URL", "postgres://db/kbatch"),
            ("KBATCH_STEP_TIMEOUT_SECS", "soon"),
        ])
        .unwrap_err();
        assert_matches!(
            err,
            ConfigError::Invalid { name: "KBATCH_STEP_TIMEOUT_SECS", .. }
        );
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let err = load(&[
            ("DATABASE_URL", "postgres://db/kbatch"),
            ("KBATCH_CHUNK_SIZE", "0"),
        ])
        .unwrap_err();
        assert_matches!(err, ConfigError::Invalid { name: "KBATCH_CHUNK_SIZE", .. });
    }

    #[test]
    fn chunk_size_above_bind_limit_is_rejected() {
        let err = load(&[
            ("DATABASE_URL", "postgres://db/kbatch"),
            ("KBATCH_CHUNK_SIZE", "32768"),
        ])
        .unwrap_err();
        assert_matches!(err, ConfigError::Invalid { name: "KBATCH_CHUNK_SIZE", .. });

        let config = load(&[
            ("DATABASE_URL", "postgres://db/kbatch"),
            ("KBATCH_CHUNK_SIZE", "32767"),
        ])
        .unwrap();
        assert_eq!(config.chunk_size, MAX_BATCH_ROWS);
    }

    #[test]
    fn unknown_log_format_is_rejected() {
        let err = load(&[
            ("DATABASE_URL", "postgres://db/kbatch"),
            ("LOG_FORMAT", "xml"),
        ])
        .unwrap_err();
        assert_matches!(err, ConfigError::Invalid { name: "LOG_FORMAT", .. });
    }

    #[test]
    fn template_runs_command_through_bash_and_mounts_claim() {
        let config = load(&[
            ("DATABASE_URL", "postgres://db/kbatch"),
            ("KBATCH_PVC_CLAIM", "shared-data"),
            ("KBATCH_WORKLOAD_COMMAND", "echo hi > $FILENAME"),
        ])
        .unwrap();

        let template = config.workload_template();
        assert_eq!(template.command, vec!["/bin/bash", "-c", "echo hi > $FILENAME"]);
        assert_eq!(template.volume, Some(VolumeBinding::new("shared-data")));
    }
}
