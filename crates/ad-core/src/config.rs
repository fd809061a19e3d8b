use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::log_record::DEFAULT_LOG_CAPACITY;

/// Top-level configuration loaded from `~/.autodeploy/config.toml`.
///
/// Access tokens are never stored here; they are typed into the chat by the
/// user and forwarded once to the backend.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub poller: PollerConfig,
    #[serde(default)]
    pub logs: LogsConfig,
}

impl Config {
    /// Load config from `~/.autodeploy/config.toml`, falling back to
    /// defaults when the file does not exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(path)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            let cfg = Config::default();
            cfg.validate()?;
            Ok(cfg)
        }
    }

    /// Load from a specific path.
    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let text = std::fs::read_to_string(&path).map_err(|e| ConfigError::Io(e.to_string()))?;
        let cfg: Config = toml::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Serialize config to TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        self.validate()?;
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.backend.validate()?;
        self.poller.validate()?;
        self.logs.validate()?;
        Ok(())
    }

    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".autodeploy")
            .join("config.toml")
    }
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io: {0}")]
    Io(String),
    #[error("parse: {0}")]
    Parse(String),
    #[error("validation: {0}")]
    Validation(String),
}

// ---------------------------------------------------------------------------
// Section structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Emit logs as JSON lines instead of human-readable text.
    #[serde(default)]
    pub json_logs: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
    /// Branch sent with every analysis request.
    #[serde(default = "default_branch")]
    pub default_branch: String,
    /// Connection establishment only; requests and the log stream have no
    /// overall deadline.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_prefix: default_api_prefix(),
            default_branch: default_branch(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl BackendConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let url = self.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Validation(format!(
                "backend.base_url must be an http(s) URL, got {:?}",
                self.base_url
            )));
        }
        if self.default_branch.trim().is_empty() {
            return Err(ConfigError::Validation(
                "backend.default_branch must not be empty".into(),
            ));
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".into()
}
fn default_api_prefix() -> String {
    "/api/v1".into()
}
fn default_branch() -> String {
    "main".into()
}
fn default_connect_timeout_secs() -> u64 {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
        }
    }
}

impl PollerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_ms < 100 {
            return Err(ConfigError::Validation(format!(
                "poller.interval_ms must be at least 100, got {}",
                self.interval_ms
            )));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

fn default_interval_ms() -> u64 {
    2000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsConfig {
    /// Most recent entries kept in the live log window.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
        }
    }
}

impl LogsConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::Validation(
                "logs.capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

fn default_capacity() -> usize {
    DEFAULT_LOG_CAPACITY
}
