//! The binding itself - a function or a work unit exposed as a capability.

use crate::tooling::ToolDefinition;
use crate::unit::WorkUnit;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// A typed async function callable as a tool.
///
/// Implementations take structured arguments and return a structured result;
/// any error they report is surfaced to the calling unit as a
/// `ToolInvocationFailure`. Side effects outside the state store (shelling
/// out, mutating external infrastructure) are entirely the implementation's
/// responsibility.
#[async_trait]
pub trait ToolFn: Send + Sync {
    /// Execute the tool with the given arguments.
    async fn call(&self, arguments: Value) -> Result<Value>;
}

#[derive(Clone)]
enum BindingKind {
    Function(Arc<dyn ToolFn>),
    Unit(Arc<dyn WorkUnit>),
}

/// An invocable capability: a definition plus its implementation.
///
/// The two variants share one call contract. A bound work unit behaves like
/// a sub-call with explicit arguments: it receives the arguments as its
/// input, sees no ambient state, and only its output value travels back.
/// The capability graph over unit bindings is validated acyclic when a
/// session is built.
#[derive(Clone)]
pub struct ToolBinding {
    definition: ToolDefinition,
    timeout: Option<Duration>,
    kind: BindingKind,
}

impl ToolBinding {
    /// Bind a typed function under the given definition.
    pub fn function(definition: ToolDefinition, tool: impl ToolFn + 'static) -> Self {
        Self {
            definition,
            timeout: None,
            kind: BindingKind::Function(Arc::new(tool)),
        }
    }

    /// Bind another work unit as a callable capability.
    ///
    /// The binding takes the unit's own name; `description` tells callers
    /// when to delegate to it.
    pub fn unit(unit: Arc<dyn WorkUnit>, description: impl Into<String>) -> Self {
        let definition = ToolDefinition::new_simple(unit.name(), description);
        Self {
            definition,
            timeout: None,
            kind: BindingKind::Unit(unit),
        }
    }

    /// Set a per-call timeout. A call exceeding it is cancelled and reported
    /// as a `ToolInvocationFailure`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The binding's unique name.
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// The binding's definition.
    pub fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    /// The configured per-call timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// The bound work unit, if this binding wraps one.
    pub fn bound_unit(&self) -> Option<&Arc<dyn WorkUnit>> {
        match &self.kind {
            BindingKind::Unit(unit) => Some(unit),
            BindingKind::Function(_) => None,
        }
    }

    pub(crate) async fn execute(&self, arguments: Value) -> Result<Value> {
        match &self.kind {
            BindingKind::Function(tool) => tool.call(arguments).await,
            BindingKind::Unit(unit) => {
                let invoker = crate::tooling::ToolInvoker::for_unit(unit.as_ref());
                let output = unit
                    .invoke(arguments, crate::state::StateSnapshot::empty(), &invoker)
                    .await?;
                if !output.mutations.is_empty() {
                    tracing::debug!(
                        unit = unit.name(),
                        keys = ?output.mutations.keys().collect::<Vec<_>>(),
                        "dropping state writes from unit invoked as tool"
                    );
                }
                Ok(output.value)
            }
        }
    }
}

impl std::fmt::Debug for ToolBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.kind {
            BindingKind::Function(_) => "function",
            BindingKind::Unit(_) => "unit",
        };
        f.debug_struct("ToolBinding")
            .field("name", &self.definition.name)
            .field("kind", &kind)
            .field("timeout", &self.timeout)
            .finish()
    }
}
