//! Bridge configuration loaded from YAML.
//!
//! ```yaml
//! watch:
//!   poll_interval_secs: 10
//!   max_poll_attempts: 5
//!   backoff_initial_millis: 500
//!   backoff_max_millis: 30000
//!   max_run_lifetime_secs: 86400
//! ```
//!
//! Every key is optional; omitted keys take the defaults shown. Omitting
//! `max_run_lifetime_secs` keeps the 24 hour bound; set it to `0` to poll
//! until a terminal state.

use crate::run::services::{BackoffPolicy, WatchSettings};
use camino::Utf8Path;
use cap_std::{ambient_authority, fs_utf8::Dir};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while loading configuration.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration {path}: {source}")]
    Io {
        /// File that could not be read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The file is not valid configuration YAML.
    #[error("failed to parse configuration: {0}")]
    Parse(String),

    /// A value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level bridge configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    /// Status watcher timing.
    pub watch: WatchConfig,
}

/// Status watcher timing as written in the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatchConfig {
    /// Seconds between status polls.
    pub poll_interval_secs: u64,
    /// Attempts per poll before the run is marked errored.
    pub max_poll_attempts: u32,
    /// Delay after the first failed attempt, in milliseconds.
    pub backoff_initial_millis: u64,
    /// Ceiling on the retry delay, in milliseconds.
    pub backoff_max_millis: u64,
    /// Wall-clock bound on a run in seconds; `0` disables the bound.
    pub max_run_lifetime_secs: Option<u64>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: WatchSettings::DEFAULT_POLL_INTERVAL.as_secs(),
            max_poll_attempts: BackoffPolicy::DEFAULT_MAX_ATTEMPTS,
            backoff_initial_millis: duration_millis(BackoffPolicy::DEFAULT_INITIAL_DELAY),
            backoff_max_millis: duration_millis(BackoffPolicy::DEFAULT_MAX_DELAY),
            max_run_lifetime_secs: None,
        }
    }
}

impl BridgeConfig {
    /// Loads and validates the configuration file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the file cannot be read, and parse
    /// or validation errors as for [`BridgeConfig::from_yaml_str`].
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        let io_error = |source: std::io::Error| ConfigError::Io {
            path: path.to_string(),
            source: Arc::new(source),
        };
        let parent = path
            .parent()
            .filter(|parent| !parent.as_str().is_empty())
            .unwrap_or_else(|| Utf8Path::new("."));
        let file_name = path.file_name().ok_or_else(|| {
            io_error(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "configuration path has no file name",
            ))
        })?;
        let dir = Dir::open_ambient_dir(parent, ambient_authority()).map_err(io_error)?;
        let contents = dir.read_to_string(file_name).map_err(io_error)?;
        tracing::debug!(path = %path, "configuration loaded");
        Self::from_yaml_str(&contents)
    }

    /// Parses and validates configuration from YAML text.
    ///
    /// An empty document yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed YAML or unknown keys and
    /// [`ConfigError::Invalid`] when a value is out of range.
    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        let config = if contents.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(contents).map_err(|err| ConfigError::Parse(err.to_string()))?
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let watch = &self.watch;
        if watch.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "watch.poll_interval_secs must be positive".to_owned(),
            ));
        }
        if watch.max_poll_attempts == 0 {
            return Err(ConfigError::Invalid(
                "watch.max_poll_attempts must be positive".to_owned(),
            ));
        }
        if watch.backoff_max_millis < watch.backoff_initial_millis {
            return Err(ConfigError::Invalid(
                "watch.backoff_max_millis must not be below watch.backoff_initial_millis"
                    .to_owned(),
            ));
        }
        Ok(())
    }

    /// Converts the watch section into watcher settings.
    #[must_use]
    pub const fn watch_settings(&self) -> WatchSettings {
        let watch = &self.watch;
        let max_lifetime = match watch.max_run_lifetime_secs {
            None => Some(WatchSettings::DEFAULT_MAX_LIFETIME),
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
        };
        WatchSettings {
            poll_interval: Duration::from_secs(watch.poll_interval_secs),
            backoff: BackoffPolicy::new(
                Duration::from_millis(watch.backoff_initial_millis),
                Duration::from_millis(watch.backoff_max_millis),
                watch.max_poll_attempts,
            ),
            max_lifetime,
        }
    }
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
