//! Command execution building block for shell-backed tool functions.
//!
//! The orchestration core never runs commands itself; hosts that implement
//! tool capabilities over external commands use [`CommandExecutor`] for the
//! process handling and, with the `tooling` feature, [`CommandTool`] to
//! expose it as a bindable tool function.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command as TokioCommand;
use tokio::time::timeout;

#[cfg(feature = "tooling")]
mod tool;

#[cfg(feature = "tooling")]
pub use tool::CommandTool;

/// Execution result containing command output and metadata.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Process exit code (-1 if unavailable).
    pub exit_code: i32,
    /// Whether the process exited successfully.
    pub success: bool,
}

/// Executes shell commands with a timeout.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    timeout_seconds: u64,
    working_dir: PathBuf,
    enable_validation: bool,
}

impl CommandExecutor {
    /// Initialize command executor.
    ///
    /// # Arguments
    /// * `timeout_seconds` - Default timeout for command execution.
    /// * `working_dir` - Working directory for commands.
    /// * `enable_validation` - Reject obviously destructive commands.
    pub fn new(timeout_seconds: u64, working_dir: Option<&Path>, enable_validation: bool) -> Self {
        Self {
            timeout_seconds,
            working_dir: working_dir.unwrap_or(Path::new(".")).to_path_buf(),
            enable_validation,
        }
    }

    /// Execute a shell command with timeout.
    ///
    /// # Arguments
    /// * `command` - Shell command to execute.
    /// * `timeout_override` - Optional timeout override in seconds.
    ///
    /// # Returns
    /// ExecutionResult with stdout, stderr, and exit code.
    pub async fn execute_command(
        &self,
        command: &str,
        timeout_override: Option<u64>,
    ) -> Result<ExecutionResult> {
        let timeout_secs = timeout_override.unwrap_or(self.timeout_seconds);

        let (valid, reason) = self.validate_command(command);
        if !valid {
            return Err(anyhow::anyhow!("Command rejected: {}", reason));
        }

        let mut cmd = TokioCommand::new("sh");
        cmd.arg("-c")
            .arg(command)
            .current_dir(&self.working_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(Stdio::null());

        match timeout(Duration::from_secs(timeout_secs), cmd.output()).await {
            Ok(Ok(output)) => {
                let stdout = String::from_utf8_lossy(&output.stdout).to_string();
                let stderr = String::from_utf8_lossy(&output.stderr).to_string();
                let exit_code = output.status.code().unwrap_or(-1);
                let success = output.status.success();

                Ok(ExecutionResult {
                    stdout,
                    stderr,
                    exit_code,
                    success,
                })
            }
            Ok(Err(e)) => Err(anyhow::anyhow!("Failed to execute command: {}", e)),
            Err(_) => Err(anyhow::anyhow!(
                "Command timed out after {} seconds",
                timeout_secs
            )),
        }
    }

    /// Validate command safety (basic checks).
    ///
    /// # Arguments
    /// * `command` - Command to validate.
    ///
    /// # Returns
    /// Tuple of (is_valid, error_message).
    pub fn validate_command(&self, command: &str) -> (bool, String) {
        if !self.enable_validation {
            return (true, String::new());
        }

        let command = command.trim();

        if command.is_empty() {
            return (false, "Command cannot be empty".to_string());
        }

        let dangerous_patterns = [
            "rm -rf /",
            "rm -rf *",
            "mkfs.",
            "dd if=",
            ":(){ :|:& };:", // Fork bomb
            "curl | sh",
            "wget | sh",
        ];

        let command_lower = command.to_lowercase();
        for pattern in &dangerous_patterns {
            if command_lower.contains(pattern) {
                return (
                    false,
                    format!("Potentially dangerous command detected: {}", pattern),
                );
            }
        }

        (true, String::new())
    }

    /// Get the working directory.
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Get the default timeout in seconds.
    pub fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds
    }
}

impl Default for CommandExecutor {
    fn default() -> Self {
        Self::new(30, None, true)
    }
}
