//! Configuration management for orchestration hosts.
//!
//! This module provides configuration loading through TOML files and
//! environment variable management via `.env` files. The values here are
//! defaults a host feeds into the composite builders (iteration caps,
//! timeouts) and the session logger.
//!
//! # Example
//!
//! ```no_run
//! use aok::config::{ConfigurationLoader, EnvironmentLoader};
//! use std::path::Path;
//!
//! // Load environment variables
//! let env = EnvironmentLoader::new(None);
//!
//! // Load configuration from TOML
//! let config_loader = ConfigurationLoader::new(Some(Path::new("config/aok.toml"))).unwrap();
//! let config = &config_loader.config;
//!
//! // Access configuration
//! println!("Max iterations: {}", config.execution.max_iterations);
//! println!("Log level override: {:?}", env.log_level());
//! ```

pub mod config;
pub mod environment;

// Re-export main types for convenience
pub use self::config::{
    Configuration, ConfigurationLoader, ExecutionConfig, LoggingConfig, SessionConfig,
};
pub use self::environment::EnvironmentLoader;
