//! Environment variable loading and management.
//!
//! This module handles ONLY host-level configuration. Anything a concrete
//! work unit implementation needs (API keys, endpoints, models) belongs to
//! that implementation, not to the orchestration core.

use std::env;
use std::path::Path;

/// Loads environment variables from .env file and system environment.
#[derive(Debug, Clone)]
pub struct EnvironmentLoader {
    #[allow(dead_code)]
    env_file: Option<String>,
}

impl EnvironmentLoader {
    /// Initialize the environment loader.
    ///
    /// # Arguments
    /// * `env_file` - Path to .env file. If None, looks for .env in current directory.
    pub fn new(env_file: Option<&Path>) -> Self {
        let env_path = env_file.unwrap_or(Path::new(".env"));

        // Only load a .env file if an explicit path was provided. This avoids
        // picking up repository or system .env files during unit tests which
        // expect default values.
        if env_file.is_some() && env_path.exists() {
            if let Err(e) = dotenv::from_path(env_path) {
                eprintln!("Warning: Failed to load .env file: {}", e);
            }
        }

        Self {
            env_file: env_file.map(|p| p.to_string_lossy().to_string()),
        }
    }

    /// Get the session log level from `AOK_LOG_LEVEL`, if set.
    pub fn log_level(&self) -> Option<String> {
        env::var("AOK_LOG_LEVEL").ok()
    }

    /// Get a loop iteration cap override from `AOK_MAX_ITERATIONS`, if set
    /// and parseable.
    pub fn max_iterations(&self) -> Option<u32> {
        env::var("AOK_MAX_ITERATIONS")
            .ok()
            .and_then(|v| v.parse().ok())
    }
}

impl Default for EnvironmentLoader {
    fn default() -> Self {
        Self::new(None)
    }
}
