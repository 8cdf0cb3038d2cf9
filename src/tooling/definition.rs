//! Tool definition type describing an invocable capability.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;

/// The canonical description of a tool binding.
///
/// A definition carries what a caller (or a language model choosing among
/// capabilities) needs to know: the unique name, a human-readable
/// description, and a JSON Schema for the accepted arguments.
///
/// # Example
///
/// ```
/// use aok::tooling::ToolDefinition;
/// use serde_json::json;
///
/// let def = ToolDefinition::new(
///     "check_pod_status",
///     "Check the status of pods in a Kubernetes namespace",
///     json!({
///         "type": "object",
///         "properties": {
///             "namespace": { "type": "string", "description": "Namespace to check" }
///         },
///         "required": ["namespace"]
///     }),
/// );
///
/// let schema = def.to_function_schema();
/// assert_eq!(schema["function"]["name"], "check_pod_status");
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolDefinition {
	/// Unique identifier for this binding.
	///
	/// Used for lookup in a [`ToolSet`](crate::tooling::ToolSet) and must be
	/// unique within the set.
	pub name: String,

	/// Human-readable description of what the capability does and when to
	/// use it.
	pub description: String,

	/// JSON Schema describing the accepted arguments.
	pub parameters: Value,

	/// Optional metadata for routing, filtering, or display purposes.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub metadata: Option<HashMap<String, Value>>,
}

impl ToolDefinition {
	/// Create a definition with an explicit parameter schema.
	pub fn new(
		name: impl Into<String>,
		description: impl Into<String>,
		parameters: Value,
	) -> Self {
		Self {
			name: name.into(),
			description: description.into(),
			parameters,
			metadata: None,
		}
	}

	/// Create a definition that takes no arguments.
	///
	/// # Example
	///
	/// ```
	/// use aok::tooling::ToolDefinition;
	///
	/// let def = ToolDefinition::new_simple("exit_loop", "Approve and stop iterating");
	/// assert_eq!(def.name, "exit_loop");
	/// ```
	pub fn new_simple(name: impl Into<String>, description: impl Into<String>) -> Self {
		Self::new(
			name,
			description,
			json!({ "type": "object", "properties": {} }),
		)
	}

	/// Attach a metadata entry.
	pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
		self.metadata
			.get_or_insert_with(HashMap::new)
			.insert(key.into(), value);
		self
	}

	/// Generate a function-calling schema for this definition.
	pub fn to_function_schema(&self) -> Value {
		json!({
			"type": "function",
			"function": {
				"name": self.name,
				"description": self.description,
				"parameters": self.parameters,
			}
		})
	}
}
