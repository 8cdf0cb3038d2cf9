//! Tool invoker - resolves and executes a unit's tool calls.

use crate::error::OrchestrationError;
use crate::tooling::ToolSet;
use crate::unit::WorkUnit;
use serde_json::Value;
use uuid::Uuid;

/// Resolves tool calls against one unit's bound capabilities.
///
/// The invoking composite constructs one of these per child from the
/// child's declared [`ToolSet`] and passes it into `invoke`. Calls are
/// synchronous from the unit's perspective: the unit suspends until the
/// tool returns, without blocking sibling units in a parallel composite.
#[derive(Clone, Debug, Default)]
pub struct ToolInvoker {
    set: ToolSet,
}

impl ToolInvoker {
    /// An invoker over an explicit set.
    pub fn new(set: ToolSet) -> Self {
        Self { set }
    }

    /// An invoker over a unit's declared tool set.
    pub fn for_unit(unit: &dyn WorkUnit) -> Self {
        Self::new(unit.tool_set())
    }

    /// An invoker with no capabilities.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The underlying set.
    pub fn set(&self) -> &ToolSet {
        &self.set
    }

    /// Call a bound tool by name.
    ///
    /// An unknown name, a failed implementation, or an elapsed per-binding
    /// timeout all surface as `ToolInvocationFailure`; the calling unit
    /// decides whether to retry, degrade, or fail its own step.
    pub async fn call(&self, tool: &str, arguments: Value) -> Result<Value, OrchestrationError> {
        let binding = self
            .set
            .get(tool)
            .ok_or_else(|| OrchestrationError::tool_failure(tool, "no such tool binding"))?;

        let call_id = Uuid::new_v4();
        tracing::debug!(%call_id, tool, "tool call started");

        let result = match binding.timeout() {
            Some(limit) => match tokio::time::timeout(limit, binding.execute(arguments)).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(%call_id, tool, ?limit, "tool call timed out");
                    return Err(OrchestrationError::tool_failure(
                        tool,
                        format!("timed out after {}s", limit.as_secs()),
                    ));
                }
            },
            None => binding.execute(arguments).await,
        };

        match result {
            Ok(value) => {
                tracing::debug!(%call_id, tool, "tool call completed");
                Ok(value)
            }
            Err(e) => {
                tracing::warn!(%call_id, tool, error = %e, "tool call failed");
                Err(OrchestrationError::tool_failure(tool, e.to_string()))
            }
        }
    }
}
