//! Client configuration with validation.
//!
//! # Config File Format
//!
//! ```toml
//! rpc_url = "https://perun.example.org/krb/rpc/json/"
//!
//! [recovery]
//! timeout_threshold = "5m"
//! poll_interval = "10s"
//! pending_request_path = "utilsManager/getPendingRequest"
//!
//! [http]
//! connect_timeout = "10s"
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::domain::classify::RECOVERY_THRESHOLD;

/// Upper bound for configured durations (one day)
pub const MAX_DURATION: Duration = Duration::from_secs(24 * 60 * 60);

/// Environment variable overriding `rpc_url`
pub const RPC_URL_ENV: &str = "PERUN_RPC_URL";

/// Main client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Prefix every call path is appended to
    pub rpc_url: String,
    /// Pending request recovery configuration
    pub recovery: RecoveryConfig,
    /// HTTP transport configuration
    pub http: HttpConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://localhost/krb/rpc/json/".to_string(),
            recovery: RecoveryConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Config for the given RPC URL, everything else default
    pub fn with_rpc_url(rpc_url: impl Into<String>) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            error: e.to_string(),
        })?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply overrides from the environment (`PERUN_RPC_URL`).
    pub fn apply_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(RPC_URL_ENV) {
            if !url.trim().is_empty() {
                self.rpc_url = url;
            }
        }
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rpc_url.trim().is_empty() {
            return Err(ConfigError::InvalidUrl("rpc_url cannot be empty".into()));
        }

        if self.recovery.poll_interval.is_zero() {
            return Err(ConfigError::InvalidInterval(
                "poll_interval cannot be 0".into(),
            ));
        }

        if self.recovery.poll_interval > MAX_DURATION {
            return Err(ConfigError::InvalidInterval(format!(
                "poll_interval cannot exceed {}s",
                MAX_DURATION.as_secs()
            )));
        }

        if self.recovery.timeout_threshold > MAX_DURATION {
            return Err(ConfigError::Invalid(format!(
                "timeout_threshold cannot exceed {}s",
                MAX_DURATION.as_secs()
            )));
        }

        if self.http.connect_timeout > MAX_DURATION {
            return Err(ConfigError::Invalid(format!(
                "connect_timeout cannot exceed {}s",
                MAX_DURATION.as_secs()
            )));
        }

        if self.recovery.pending_request_path.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "pending_request_path cannot be empty".into(),
            ));
        }

        Ok(())
    }
}

/// Pending request recovery configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    /// Age at which a 500 is presumed to be a proxy timeout
    #[serde(with = "humantime_serde")]
    pub timeout_threshold: Duration,
    /// Delay between two pending request queries
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    /// Path of the pending request status method, relative to `rpc_url`
    pub pending_request_path: String,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            timeout_threshold: RECOVERY_THRESHOLD,
            poll_interval: Duration::from_secs(10),
            pending_request_path: "utilsManager/getPendingRequest".to_string(),
        }
    }
}

/// HTTP transport configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Connection establishment timeout (the call itself has no timeout)
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    /// User-Agent header
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            user_agent: crate::user_agent(),
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read {path}: {error}")]
    Io { path: String, error: String },
    /// File is not valid TOML for this structure
    #[error("failed to parse config: {0}")]
    Parse(String),
    /// Invalid RPC URL
    #[error("invalid rpc url: {0}")]
    InvalidUrl(String),
    /// Invalid polling interval
    #[error("invalid interval: {0}")]
    InvalidInterval(String),
    /// General configuration error
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Humantime serde module for Duration serialization
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format_duration(duration))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub(super) fn format_duration(duration: &Duration) -> String {
        let secs = duration.as_secs();
        if duration.subsec_nanos() != 0 {
            format!("{}ms", duration.as_millis())
        } else if secs != 0 && secs % 60 == 0 {
            format!("{}m", secs / 60)
        } else {
            format!("{}s", secs)
        }
    }

    pub(super) fn parse_duration(s: &str) -> Result<Duration, &'static str> {
        let s = s.trim();
        if let Some(ms) = s.strip_suffix("ms") {
            ms.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| "invalid milliseconds")
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid seconds")
        } else if let Some(mins) = s.strip_suffix('m') {
            mins.trim()
                .parse::<u64>()
                .map_err(|_| "invalid minutes")
                .and_then(|m| m.checked_mul(60).ok_or("minutes out of range"))
                .map(Duration::from_secs)
        } else {
            // Try parsing as plain seconds
            s.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid duration format")
        }
    }
}
