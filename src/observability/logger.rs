//! Logging system for orchestration sessions.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Logger for orchestration sessions.
///
/// Creates markdown-formatted log files tracking session lifecycle, turn
/// results, and failures. One logger serves one session; attach it to a
/// session runner or call it directly from a host.
#[derive(Debug)]
pub struct Logger {
    log_file: PathBuf,
    log_level: String,
}

impl Logger {
    /// Initialize logger.
    ///
    /// # Arguments
    /// * `log_file` - Path to log file. If None, creates a timestamped file in temp directory.
    /// * `log_level` - Logging level (defaults to "INFO").
    pub fn new(log_file: Option<&Path>, log_level: Option<&str>) -> Result<Self> {
        let log_file = match log_file {
            Some(p) => p.to_path_buf(),
            None => {
                let mut dir = std::env::temp_dir();
                dir.push("aok-logs");
                std::fs::create_dir_all(&dir).with_context(|| {
                    format!("Failed to create log directory: {}", dir.display())
                })?;
                let filename = format!(
                    "session_{}_{}.md",
                    Utc::now().timestamp_millis(),
                    std::process::id()
                );
                dir.join(filename)
            }
        };

        let log_level = log_level.unwrap_or("INFO").to_string();

        // Ensure log directory exists
        if let Some(parent) = log_file.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
        }

        let logger = Self {
            log_file,
            log_level,
        };

        if !logger.log_file.exists() {
            logger.initialize_log_file()?;
        }

        Ok(logger)
    }

    /// Path of the log file.
    pub fn log_file(&self) -> &Path {
        &self.log_file
    }

    /// Configured log level.
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    fn debug_enabled(&self) -> bool {
        self.log_level.to_lowercase().contains("debug")
    }

    /// Initialize the log file with header.
    fn initialize_log_file(&self) -> Result<()> {
        let mut file = File::create(&self.log_file)
            .with_context(|| format!("Failed to create log file: {}", self.log_file.display()))?;

        let now: DateTime<Utc> = Utc::now();

        writeln!(file, "# Session Orchestration Log\n")?;
        writeln!(file, "Log started: {}\n", now.to_rfc3339())?;
        writeln!(file, "---\n")?;

        Ok(())
    }

    /// Append content to log file.
    fn append_to_log(&self, content: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file)
            .with_context(|| format!("Failed to open log file: {}", self.log_file.display()))?;

        write!(file, "{}", content).with_context(|| "Failed to write to log file")?;

        Ok(())
    }

    /// Log session start.
    ///
    /// # Arguments
    /// * `session_id` - Identifier of the session.
    /// * `root_unit` - Name of the root work unit driving the session.
    pub fn log_session_start(&self, session_id: &str, root_unit: &str) -> Result<()> {
        let now: DateTime<Utc> = Utc::now();
        let content = format!(
            "## Session Started - {}\n\n**Session:** {}\n**Root unit:** {}\n\n",
            now.to_rfc3339(),
            session_id,
            root_unit
        );

        self.append_to_log(&content)?;
        println!(
            "INFO: Session {} started with root '{}'",
            session_id, root_unit
        );
        Ok(())
    }

    /// Log the result of one turn.
    ///
    /// # Arguments
    /// * `termination` - Termination reason name.
    /// * `keys_written` - State keys the turn wrote.
    /// * `failed_children` - Names of children that failed in partial fan-outs.
    pub fn log_turn(
        &self,
        termination: &str,
        keys_written: &[String],
        failed_children: &[String],
    ) -> Result<()> {
        let now: DateTime<Utc> = Utc::now();
        let keys = if keys_written.is_empty() {
            "(none)".to_string()
        } else {
            keys_written.join(", ")
        };

        let mut content = format!(
            "### Turn - {}\n\n**Termination:** {}\n**State keys written:** {}\n",
            now.to_rfc3339(),
            termination,
            keys
        );
        if !failed_children.is_empty() {
            content.push_str(&format!(
                "**Failed children:** {}\n",
                failed_children.join(", ")
            ));
        }
        content.push('\n');

        self.append_to_log(&content)?;
        if self.debug_enabled() {
            println!("DEBUG: Turn finished ({})", termination);
        }
        Ok(())
    }

    /// Log a turn failure.
    ///
    /// # Arguments
    /// * `path` - Composite/child path that led to the failure.
    /// * `message` - Human-readable explanation.
    pub fn log_failure(&self, path: &str, message: &str) -> Result<()> {
        let now: DateTime<Utc> = Utc::now();
        let content = format!(
            "### Failure - {}\n\n**Path:** {}\n\n```\n{}\n```\n\n",
            now.to_rfc3339(),
            path,
            message
        );

        self.append_to_log(&content)?;
        eprintln!("ERROR: {} failed: {}", path, message);
        Ok(())
    }

    /// Log session completion.
    ///
    /// # Arguments
    /// * `reason` - Completion reason.
    pub fn log_completion(&self, reason: &str) -> Result<()> {
        let now: DateTime<Utc> = Utc::now();
        let content = format!(
            "## Session Completed - {}\n\n**Reason:** {}\n\n---\n\n",
            now.to_rfc3339(),
            reason
        );

        self.append_to_log(&content)?;
        println!("INFO: Session completed: {}", reason);
        Ok(())
    }
}
