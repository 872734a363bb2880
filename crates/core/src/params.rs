//! Pipeline job parameters.
//!
//! Parameters arrive as `key=value` pairs on the command line. One key,
//! [`INPUT_FILE_LOCATION`], is required by every run; all other keys pass
//! through untouched into the external workload's environment.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Location of the file the external workload materializes and the load
/// step reads.
pub const INPUT_FILE_LOCATION: &str = "inputFileLocation";

/// Keys every pipeline run must carry.
pub const REQUIRED_PARAMETERS: &[&str] = &[INPUT_FILE_LOCATION];

/// An immutable-by-convention bag of string parameters with unique keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobParameters(BTreeMap<String, String>);

impl JobParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert. A later value for the same key replaces the
    /// earlier one.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Return the value for `key`, failing if it is absent or blank.
    pub fn require(&self, key: &str) -> Result<&str, CoreError> {
        match self.get(key) {
            Some(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(CoreError::MissingParameter(key.to_string())),
        }
    }

    /// Check that every key in [`REQUIRED_PARAMETERS`] is present and
    /// non-blank.
    pub fn validate_required(&self) -> Result<(), CoreError> {
        for key in REQUIRED_PARAMETERS {
            self.require(key)?;
        }
        Ok(())
    }

    /// Parse `key=value` arguments.
    ///
    /// The value may itself contain `=`; only the first one splits. An
    /// argument without `=` or with an empty key is rejected.
    pub fn parse_args<I, S>(args: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut params = Self::new();
        for arg in args {
            let arg = arg.as_ref();
            let Some((key, value)) = arg.split_once('=') else {
                return Err(CoreError::InvalidParameter(format!(
                    "expected key=value, got '{arg}'"
                )));
            };
            let key = key.trim();
            if key.is_empty() {
                return Err(CoreError::InvalidParameter(format!(
                    "empty key in '{arg}'"
                )));
            }
            params.0.insert(key.to_string(), value.to_string());
        }
        Ok(params)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for JobParameters {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
