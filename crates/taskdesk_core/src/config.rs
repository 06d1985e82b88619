//! Application configuration.
//!
//! # Responsibility
//! - Provide defaults for logging and view timing.
//! - Apply `TASKDESK_*` environment overrides.
//!
//! # Invariants
//! - Invalid overrides are rejected, never silently ignored.

use crate::logging::default_log_level;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_LOG_LEVEL: &str = "TASKDESK_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "TASKDESK_LOG_DIR";
pub const ENV_DELETE_TRANSITION_MS: &str = "TASKDESK_DELETE_TRANSITION_MS";

const DEFAULT_DELETE_TRANSITION: Duration = Duration::from_millis(100);
const MAX_DELETE_TRANSITION: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub log_level: String,
    /// `None` keeps file logging off.
    pub log_dir: Option<PathBuf>,
    /// Delay between the exit transition and removal of a deleted row.
    pub delete_transition: Duration,
    /// Delay before a deferred focus call runs.
    pub focus_delay: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level().to_string(),
            log_dir: None,
            delete_transition: DEFAULT_DELETE_TRANSITION,
            focus_delay: Duration::ZERO,
        }
    }
}

impl AppConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by `lookup`; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let read = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(level) = read(ENV_LOG_LEVEL) {
            config.log_level = level;
        }
        if let Some(dir) = read(ENV_LOG_DIR) {
            config.log_dir = Some(PathBuf::from(dir));
        }
        if let Some(raw) = read(ENV_DELETE_TRANSITION_MS) {
            let millis = raw.parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                key: ENV_DELETE_TRANSITION_MS,
                value: raw.clone(),
            })?;
            let delay = Duration::from_millis(millis);
            if delay > MAX_DELETE_TRANSITION {
                return Err(ConfigError::InvalidValue {
                    key: ENV_DELETE_TRANSITION_MS,
                    value: raw,
                });
            }
            config.delete_transition = delay;
        }

        Ok(config)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue { key: &'static str, value: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { key, value } => write!(f, "invalid value `{value}` for {key}"),
        }
    }
}

impl Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::{AppConfig, ConfigError, ENV_DELETE_TRANSITION_MS, ENV_LOG_DIR, ENV_LOG_LEVEL};
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::time::Duration;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<HashMap<_, _>>();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = AppConfig::from_lookup(lookup(&[])).expect("defaults");
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.delete_transition, Duration::from_millis(100));
    }

    #[test]
    fn overrides_are_applied_and_blank_values_ignored() {
        let config = AppConfig::from_lookup(lookup(&[
            (ENV_LOG_LEVEL, "warn"),
            (ENV_LOG_DIR, "/var/log/taskdesk"),
            (ENV_DELETE_TRANSITION_MS, "  "),
        ]))
        .expect("valid overrides");

        assert_eq!(config.log_level, "warn");
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/taskdesk")));
        assert_eq!(config.delete_transition, Duration::from_millis(100));
    }

    #[test]
    fn rejects_unparsable_or_excessive_transition() {
        for raw in ["fast", "-1", "60000"] {
            let err = AppConfig::from_lookup(lookup(&[(ENV_DELETE_TRANSITION_MS, raw)]))
                .expect_err("invalid transition");
            assert!(matches!(err, ConfigError::InvalidValue { .. }), "{raw}");
        }
    }
}
