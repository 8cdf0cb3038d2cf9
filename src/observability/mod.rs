//! Observability utilities for orchestration sessions.
//!
//! This module provides the file-backed session logger. Fine-grained events
//! inside the orchestration core (pipeline steps, tool calls, fan-out joins)
//! are emitted as `tracing` records; the logger here is the durable,
//! human-readable account of a session.
//!
//! # Example
//!
//! ```no_run
//! use aok::observability::Logger;
//!
//! // Create a logger
//! let logger = Logger::new(None, Some("DEBUG")).unwrap();
//!
//! // Log a session start
//! logger.log_session_start("a3f2c9d4", "command_helper").unwrap();
//!
//! // Log a turn and completion
//! logger.log_turn("completed", &["raw_command".to_string()], &[]).unwrap();
//! logger.log_completion("conversation ended").unwrap();
//! ```

pub mod logger;

// Re-export main types for convenience
pub use logger::Logger;
