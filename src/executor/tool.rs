//! Tool-function adapter over the command executor.

use crate::executor::CommandExecutor;
use crate::tooling::{ToolDefinition, ToolFn};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

/// Exposes a [`CommandExecutor`] as a bindable tool function.
///
/// Arguments: `{ "command": string, "timeout_seconds": number? }`. The
/// result mirrors the structured record shell-backed tools conventionally
/// report: `{ "success": bool, "output": string, "error": string|null }`.
/// A rejected or timed-out command is a tool failure, not a success with an
/// error field.
pub struct CommandTool {
    executor: CommandExecutor,
}

impl CommandTool {
    /// Wrap an executor.
    pub fn new(executor: CommandExecutor) -> Self {
        Self { executor }
    }

    /// The definition to register this tool under.
    pub fn definition(name: impl Into<String>, description: impl Into<String>) -> ToolDefinition {
        ToolDefinition::new(
            name,
            description,
            json!({
                "type": "object",
                "properties": {
                    "command": {
                        "type": "string",
                        "description": "Shell command to run"
                    },
                    "timeout_seconds": {
                        "type": "number",
                        "description": "Optional timeout override in seconds"
                    }
                },
                "required": ["command"]
            }),
        )
    }
}

#[async_trait]
impl ToolFn for CommandTool {
    async fn call(&self, arguments: Value) -> Result<Value> {
        let command = arguments
            .get("command")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow::anyhow!("missing required argument 'command'"))?;
        let timeout_override = arguments.get("timeout_seconds").and_then(Value::as_u64);

        let result = self.executor.execute_command(command, timeout_override).await?;
        Ok(json!({
            "success": result.success,
            "output": result.stdout,
            "error": if result.stderr.is_empty() {
                Value::Null
            } else {
                Value::String(result.stderr)
            },
        }))
    }
}
