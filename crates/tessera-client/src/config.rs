//! Client configuration.
//!
//! Values come from, in order of preference: a TOML file, `TESSERA_*`
//! environment variables, and the defaults below. The resulting
//! [`ClientConfig`] is threaded explicitly into every [`Table`](crate::Table).

use std::path::Path;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use snafu::ResultExt;
use snafu::Snafu;

/// Default values for configuration
mod defaults {
    use tessera_constants::api::DEFAULT_MAX_FETCH_COUNT;
    use tessera_constants::api::DEFAULT_MAX_FETCH_SIZE;
    use tessera_constants::api::DEFAULT_MULTI_REMOVE_MAX_COUNT;
    use tessera_constants::scan::DEFAULT_SCAN_BATCH_SIZE;
    use tessera_constants::timeouts::DEFAULT_OPERATION_TIMEOUT_MS;

    pub fn operation_timeout_ms() -> u64 {
        DEFAULT_OPERATION_TIMEOUT_MS
    }
    pub fn max_fetch_count() -> u32 {
        DEFAULT_MAX_FETCH_COUNT
    }
    pub fn max_fetch_size() -> u32 {
        DEFAULT_MAX_FETCH_SIZE
    }
    pub fn multi_remove_max_count() -> u32 {
        DEFAULT_MULTI_REMOVE_MAX_COUNT
    }
    pub fn scan_batch_size() -> u32 {
        DEFAULT_SCAN_BATCH_SIZE
    }
}

const ENV_OPERATION_TIMEOUT_MS: &str = "TESSERA_OPERATION_TIMEOUT_MS";
const ENV_MAX_FETCH_COUNT: &str = "TESSERA_MAX_FETCH_COUNT";
const ENV_MAX_FETCH_SIZE: &str = "TESSERA_MAX_FETCH_SIZE";
const ENV_MULTI_REMOVE_MAX_COUNT: &str = "TESSERA_MULTI_REMOVE_MAX_COUNT";
const ENV_SCAN_BATCH_SIZE: &str = "TESSERA_SCAN_BATCH_SIZE";

/// Configuration errors
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConfigError {
    /// A configuration value is invalid.
    #[snafu(display("invalid configuration for {key}: '{value}' ({reason})"))]
    InvalidValue { key: String, value: String, reason: String },

    /// The configuration file could not be read.
    #[snafu(display("failed to read config file {}: {source}", path.display()))]
    ReadFile { path: PathBuf, source: std::io::Error },

    /// The configuration file is not valid TOML for [`ClientConfig`].
    #[snafu(display("failed to parse config file {}: {source}", path.display()))]
    ParseToml { path: PathBuf, source: toml::de::Error },
}

/// Table-wide client settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Timeout applied when a caller passes a zero timeout.
    #[serde(default = "defaults::operation_timeout_ms")]
    pub operation_timeout_ms: u64,

    /// Default cap on entries returned by one multi-get.
    #[serde(default = "defaults::max_fetch_count")]
    pub max_fetch_count: u32,

    /// Default cap on key + value bytes returned by one multi-get.
    #[serde(default = "defaults::max_fetch_size")]
    pub max_fetch_size: u32,

    /// `max_count` carried by every multi-remove request.
    #[serde(default = "defaults::multi_remove_max_count")]
    pub multi_remove_max_count: u32,

    /// Scan batch size used when scan options leave it at zero.
    #[serde(default = "defaults::scan_batch_size")]
    pub scan_batch_size: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            operation_timeout_ms: defaults::operation_timeout_ms(),
            max_fetch_count: defaults::max_fetch_count(),
            max_fetch_size: defaults::max_fetch_size(),
            multi_remove_max_count: defaults::multi_remove_max_count(),
            scan_batch_size: defaults::scan_batch_size(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let config = Self {
            operation_timeout_ms: parse_var(&lookup, ENV_OPERATION_TIMEOUT_MS, defaults::operation_timeout_ms())?,
            max_fetch_count: parse_var(&lookup, ENV_MAX_FETCH_COUNT, defaults::max_fetch_count())?,
            max_fetch_size: parse_var(&lookup, ENV_MAX_FETCH_SIZE, defaults::max_fetch_size())?,
            multi_remove_max_count: parse_var(
                &lookup,
                ENV_MULTI_REMOVE_MAX_COUNT,
                defaults::multi_remove_max_count(),
            )?,
            scan_batch_size: parse_var(&lookup, ENV_SCAN_BATCH_SIZE, defaults::scan_batch_size())?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file; missing fields take defaults.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).context(ReadFileSnafu { path })?;
        let config: Self = toml::from_str(&contents).context(ParseTomlSnafu { path })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from TOML file if it exists, otherwise use environment variables
    pub fn load_with_optional_file(path: Option<impl AsRef<Path>>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            if path.as_ref().exists() {
                tracing::info!(path = %path.as_ref().display(), "loading client configuration from file");
                return Self::from_toml_file(path);
            }
        }

        tracing::info!("loading client configuration from environment variables");
        Self::load()
    }

    /// Every limit and timeout must be positive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_positive("operation_timeout_ms", self.operation_timeout_ms)?;
        check_positive("max_fetch_count", u64::from(self.max_fetch_count))?;
        check_positive("max_fetch_size", u64::from(self.max_fetch_size))?;
        check_positive("multi_remove_max_count", u64::from(self.multi_remove_max_count))?;
        check_positive("scan_batch_size", u64::from(self.scan_batch_size))?;
        Ok(())
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    /// The timeout a call actually runs with: `timeout`, or the table
    /// default when `timeout` is zero.
    pub fn effective_timeout(&self, timeout: Duration) -> Duration {
        if timeout.is_zero() {
            self.operation_timeout()
        } else {
            timeout
        }
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse::<T>().map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw.clone(),
            reason: format!("must be a positive integer: {e}"),
        }),
    }
}

fn check_positive(key: &str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return InvalidValueSnafu {
            key,
            value: "0",
            reason: "must be greater than 0",
        }
        .fail();
    }
    Ok(())
}
