//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/eventbeacon/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/eventbeacon/` (~/.config/eventbeacon/)
//! - State/Logs: `$XDG_STATE_HOME/eventbeacon/` (~/.local/state/eventbeacon/)
//!
//! Nothing is persisted besides logs: the retry queue and the session id live
//! in process memory only.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Event agent configuration
    #[serde(default)]
    pub agent: AgentConfig,

    /// Static enrichment values (used when no live lookup is injected)
    #[serde(default)]
    pub location: LocationConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Deployment environment reported in every payload's `env` field
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Prd,
}

impl Environment {
    /// Environment implied by the build profile: debug builds report `dev`.
    pub fn from_build() -> Self {
        if cfg!(debug_assertions) {
            Environment::Dev
        } else {
            Environment::Prd
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Dev => "dev",
            Environment::Prd => "prd",
        }
    }
}

/// Agent configuration: where events go and how they are tagged
#[derive(Debug, Deserialize, Clone)]
pub struct AgentConfig {
    /// Collection endpoint (e.g., `https://collector.example.com/events`)
    #[serde(default)]
    pub endpoint: String,

    /// Host application user id, sent as `uuid`
    #[serde(default)]
    pub user_id: String,

    /// Host application version, sent as `appVersion`
    #[serde(default)]
    pub app_version: String,

    /// Operating system description, sent as `systemVersion`
    #[serde(default = "default_system_version")]
    pub system_version: String,

    /// Overrides the build-derived environment tag
    #[serde(default)]
    pub environment: Option<Environment>,

    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            user_id: String::new(),
            app_version: String::new(),
            system_version: default_system_version(),
            environment: None,
            timeout_secs: default_timeout(),
        }
    }
}

impl AgentConfig {
    /// The effective environment tag
    pub fn environment(&self) -> Environment {
        self.environment.unwrap_or_else(Environment::from_build)
    }

    /// Validate configuration, returning error message if invalid
    ///
    /// A malformed endpoint URL passes; each record sent to it is dropped.
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            return Err(Error::Config("agent.endpoint is required".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Config(
                "agent.timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_system_version() -> String {
    std::env::consts::OS.to_string()
}

fn default_timeout() -> u64 {
    30
}

/// Fixed location values for hosts without a lookup service
#[derive(Debug, Deserialize, Default, Clone)]
pub struct LocationConfig {
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub country_code: String,
    #[serde(default)]
    pub city_code: String,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/eventbeacon/config.toml` (~/.config/eventbeacon/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("eventbeacon").join("config.toml")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/eventbeacon/` (~/.local/state/eventbeacon/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("eventbeacon")
    }

    /// Returns the log file path
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("eventbeacon.log")
    }
}
