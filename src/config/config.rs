//! TOML configuration parsing and management.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Name of the hosting application, used in log headers.
    pub app_name: String,
    /// Persist a state snapshot between turns (host-driven).
    #[serde(default)]
    pub persist_state: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            app_name: "aok".to_string(),
            persist_state: false,
        }
    }
}

/// Execution limits for composites
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Default iteration cap hosts hand to loop composites.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// Per-child timeout for parallel fan-outs, in seconds. None disables.
    #[serde(default)]
    pub parallel_child_timeout_seconds: Option<u64>,
    /// Per-call timeout for tool bindings, in seconds. None disables.
    #[serde(default)]
    pub tool_timeout_seconds: Option<u64>,
}

fn default_max_iterations() -> u32 {
    3
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            parallel_child_timeout_seconds: None,
            tool_timeout_seconds: None,
        }
    }
}

impl ExecutionConfig {
    /// The parallel per-child timeout as a `Duration`.
    pub fn parallel_child_timeout(&self) -> Option<Duration> {
        self.parallel_child_timeout_seconds.map(Duration::from_secs)
    }

    /// The tool-call timeout as a `Duration`.
    pub fn tool_timeout(&self) -> Option<Duration> {
        self.tool_timeout_seconds.map(Duration::from_secs)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level for the session logger.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Session log file path. None lets the logger pick a temp file.
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

fn default_log_level() -> String {
    "INFO".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "INFO".to_string(),
            log_file: None,
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Configuration {
    /// Session settings.
    #[serde(default)]
    pub session: SessionConfig,
    /// Execution limits.
    #[serde(default)]
    pub execution: ExecutionConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Loads and manages TOML configuration.
#[derive(Debug)]
pub struct ConfigurationLoader {
    /// Path the configuration was loaded from (or would be loaded from).
    pub config_path: PathBuf,
    /// The parsed configuration.
    pub config: Configuration,
}

impl ConfigurationLoader {
    /// Initialize configuration loader.
    ///
    /// # Arguments
    /// * `config_path` - Path to TOML config file. If None, uses default config.
    pub fn new(config_path: Option<&Path>) -> Result<Self> {
        let config_path = config_path
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("config/aok.toml"));

        let config = if config_path.exists() {
            Self::load_config(&config_path)?
        } else {
            Configuration::default()
        };

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Create a loader from a pre-parsed Configuration, reading no files.
    pub fn from_config(config: Configuration) -> Self {
        Self {
            config_path: PathBuf::from("config/aok.toml"),
            config,
        }
    }

    /// Load configuration from a TOML file.
    fn load_config(path: &Path) -> Result<Configuration> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }
}
