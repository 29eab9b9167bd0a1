use crate::{CommitPolicy, ReactiveResult};
use serde::{Deserialize, Serialize};

/// Configuration for a [`ReactiveState`](crate::ReactiveState).
///
/// Every field has a default, so a partial JSON object is a valid
/// configuration.
///
/// # Examples
///
/// ```
/// use tirea_reactive::{CommitPolicy, StateConfig};
///
/// let config = StateConfig::from_json(r#"{"commit_policy": "skip_invalid"}"#).unwrap();
/// assert_eq!(config.commit_policy, CommitPolicy::SkipInvalid);
/// assert_eq!(config.opaque_scan_warn_threshold, 64);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// How a commit treats writes whose path cannot be applied.
    pub commit_policy: CommitPolicy,
    /// Opaque-keyed buffer entries are scanned linearly. A warning is logged
    /// once per batch when their number exceeds this value.
    pub opaque_scan_warn_threshold: usize,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            commit_policy: CommitPolicy::AbortAll,
            opaque_scan_warn_threshold: 64,
        }
    }
}

impl StateConfig {
    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> ReactiveResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    #[must_use]
    pub fn with_commit_policy(mut self, policy: CommitPolicy) -> Self {
        self.commit_policy = policy;
        self
    }

    #[must_use]
    pub fn with_opaque_scan_warn_threshold(mut self, threshold: usize) -> Self {
        self.opaque_scan_warn_threshold = threshold;
        self
    }
}
