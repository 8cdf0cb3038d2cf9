//! The work unit contract - the atomic execution primitive.
//!
//! A work unit is invoked with a structured input, a read-only state
//! snapshot, and an invoker for its bound tools, and returns a
//! [`UnitOutput`]: the output value, the state writes it requests, and a
//! control signal for any enclosing loop. How a unit produces its result
//! (consulting a remote model, running a command, formatting text) is
//! entirely outside this crate; composites and the session runner depend
//! only on the contract.

use crate::state::StateDelta;
use serde_json::Value;

#[cfg(feature = "tooling")]
use crate::error::OrchestrationError;
#[cfg(feature = "tooling")]
use crate::state::StateSnapshot;
#[cfg(feature = "tooling")]
use async_trait::async_trait;
#[cfg(feature = "tooling")]
use std::sync::Arc;

/// Why an invocation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// The unit (or composite) ran to completion.
    Completed,
    /// A loop exhausted its iteration cap without an early-exit signal.
    MaxIterationsReached,
    /// A unit signaled early exit and a loop terminated at that boundary.
    EscalatedExit,
    /// A router's classifier output matched no configured specialist.
    NoRouteMatched,
}

impl TerminationReason {
    /// Stable name for logs and host-facing results.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Completed => "completed",
            Self::MaxIterationsReached => "max-iterations-reached",
            Self::EscalatedExit => "escalated-exit",
            Self::NoRouteMatched => "no-route-matched",
        }
    }

    /// Whether this is the ordinary successful termination.
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Default for TerminationReason {
    fn default() -> Self {
        Self::Completed
    }
}

/// A unit's declaration about enclosing loop control, returned alongside its
/// normal output rather than through a side channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControlSignal {
    /// Keep going.
    #[default]
    Continue,
    /// Terminate the enclosing loop at the boundary after this unit's step.
    Exit {
        /// Also skip any trailing summarization stages in enclosing
        /// pipelines.
        skip_summarization: bool,
    },
}

impl ControlSignal {
    /// Whether this signal requests loop termination.
    pub fn is_exit(&self) -> bool {
        matches!(self, Self::Exit { .. })
    }
}

/// The kind of a structured output field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// A JSON string.
    Text,
    /// A JSON number.
    Number,
    /// A JSON boolean.
    Boolean,
    /// An ordered list.
    List,
    /// A nested mapping.
    Map,
}

impl ValueKind {
    /// Stable name for error messages.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::List => "list",
            Self::Map => "map",
        }
    }

    fn matches(&self, value: &Value) -> bool {
        match self {
            Self::Text => value.is_string(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::List => value.is_array(),
            Self::Map => value.is_object(),
        }
    }
}

/// One named, typed field of a structured output record.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    /// Field name.
    pub name: String,
    /// Expected value kind.
    pub kind: ValueKind,
    /// Whether the field must be present.
    pub required: bool,
}

impl FieldSpec {
    /// A field that must be present.
    pub fn required(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
        }
    }

    /// A field that may be absent.
    pub fn optional(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
        }
    }
}

/// The declared shape of a unit's output value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum OutputShape {
    /// Unstructured output; no validation is applied.
    #[default]
    Text,
    /// A record with named, typed fields, validated by the invoking
    /// composite.
    Structured {
        /// The declared fields.
        fields: Vec<FieldSpec>,
    },
}

impl OutputShape {
    /// Declare a structured record shape.
    pub fn structured(fields: Vec<FieldSpec>) -> Self {
        Self::Structured { fields }
    }

    /// Validate a value against this shape.
    pub fn validate(&self, value: &Value) -> Result<(), String> {
        let fields = match self {
            Self::Text => return Ok(()),
            Self::Structured { fields } => fields,
        };
        let record = value
            .as_object()
            .ok_or_else(|| "structured output must be a mapping".to_string())?;
        for field in fields {
            match record.get(&field.name) {
                Some(v) if field.kind.matches(v) => {}
                Some(v) => {
                    return Err(format!(
                        "field '{}' expected {}, got {}",
                        field.name,
                        field.kind.as_str(),
                        kind_of(v)
                    ));
                }
                None if field.required => {
                    return Err(format!("required field '{}' is missing", field.name));
                }
                None => {}
            }
        }
        Ok(())
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "text",
        Value::Array(_) => "list",
        Value::Object(_) => "map",
    }
}

/// A per-child failure collected by a parallel composite.
#[derive(Debug, Clone, PartialEq)]
pub struct FailureReport {
    /// Name of the failed child.
    pub unit: String,
    /// Human-readable explanation.
    pub error: String,
}

/// What a work unit returns from one invocation.
#[derive(Debug, Clone, Default)]
pub struct UnitOutput {
    /// The output value handed back to the caller.
    pub value: Value,
    /// State writes requested by this step. A unit with a declared output
    /// key must write that key on success and nothing else.
    pub mutations: StateDelta,
    /// Loop control declaration.
    pub signal: ControlSignal,
    /// Why the step terminated; composites overwrite this for loop caps,
    /// escalated exits, and unmatched routes.
    pub termination: TerminationReason,
    /// Per-child failures, populated by parallel composites that completed
    /// partially.
    pub failures: Vec<FailureReport>,
}

impl UnitOutput {
    /// A plain text output with no state writes.
    pub fn text(value: impl Into<String>) -> Self {
        Self::value(Value::String(value.into()))
    }

    /// A structured output with no state writes.
    pub fn value(value: Value) -> Self {
        Self {
            value,
            ..Self::default()
        }
    }

    /// An output whose value is also written under the unit's declared key.
    pub fn keyed(key: impl Into<String>, value: Value) -> Self {
        let mut output = Self::value(value.clone());
        output.mutations.insert(key, value);
        output
    }

    /// Add a state write.
    pub fn with_mutation(mut self, key: impl Into<String>, value: Value) -> Self {
        self.mutations.insert(key, value);
        self
    }

    /// Replace the control signal.
    pub fn with_signal(mut self, signal: ControlSignal) -> Self {
        self.signal = signal;
        self
    }

    /// Signal the enclosing loop to terminate after this step.
    pub fn exit_loop(self, skip_summarization: bool) -> Self {
        self.with_signal(ControlSignal::Exit { skip_summarization })
    }
}

/// The atomic execution primitive.
///
/// Implementations provide identity and output declarations and an `invoke`
/// body. The state view is an immutable snapshot taken at invocation start;
/// tool calls go through the passed invoker, which resolves against the
/// unit's own declared [`tool_set`](WorkUnit::tool_set). A unit must not
/// write state outside its declared output key; the invoking composite
/// enforces the discipline and surfaces violations as that unit's failure.
#[cfg(feature = "tooling")]
#[async_trait]
pub trait WorkUnit: Send + Sync {
    /// Unique name of this unit within a composition.
    fn name(&self) -> &str;

    /// The state key this unit's result is written to, or `None` if the
    /// result is only returned to the caller.
    fn output_key(&self) -> Option<&str> {
        None
    }

    /// Declared shape of the output value.
    fn output_shape(&self) -> OutputShape {
        OutputShape::Text
    }

    /// Tool capabilities this unit may invoke.
    fn tool_set(&self) -> crate::tooling::ToolSet {
        crate::tooling::ToolSet::default()
    }

    /// Child units, for composites. Used with unit-valued tool bindings to
    /// validate the capability graph acyclic at composition time.
    fn sub_units(&self) -> Vec<Arc<dyn WorkUnit>> {
        Vec::new()
    }

    /// Whether this unit relays already-validated child writes (composites)
    /// rather than producing writes of its own.
    fn is_composite(&self) -> bool {
        false
    }

    /// Execute one step.
    async fn invoke(
        &self,
        input: Value,
        state: StateSnapshot,
        tools: &crate::tooling::ToolInvoker,
    ) -> Result<UnitOutput, OrchestrationError>;
}
