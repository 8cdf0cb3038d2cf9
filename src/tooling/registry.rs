//! Tool set - the duplicate-checked collection of a unit's bindings.

use crate::error::OrchestrationError;
use crate::tooling::{ToolBinding, ToolDefinition};
use std::collections::HashMap;
use std::sync::Arc;

/// An immutable, shareable set of tool bindings.
///
/// Built once through [`ToolSetBuilder`] and cloned cheaply (the binding map
/// is shared). A work unit returns its set from
/// [`tool_set`](crate::unit::WorkUnit::tool_set); the invoking composite
/// resolves calls against it.
///
/// # Example
///
/// ```
/// use aok::tooling::{ToolBinding, ToolDefinition, ToolFn, ToolSet};
/// use async_trait::async_trait;
/// use serde_json::Value;
///
/// struct Ping;
///
/// #[async_trait]
/// impl ToolFn for Ping {
///     async fn call(&self, _arguments: Value) -> anyhow::Result<Value> {
///         Ok(Value::String("pong".into()))
///     }
/// }
///
/// let set = ToolSet::builder()
///     .with(ToolBinding::function(
///         ToolDefinition::new_simple("ping", "Check connectivity"),
///         Ping,
///     ))
///     .build()
///     .unwrap();
///
/// assert!(set.contains("ping"));
/// assert_eq!(set.len(), 1);
/// ```
#[derive(Clone, Debug, Default)]
pub struct ToolSet {
	bindings: Arc<HashMap<String, ToolBinding>>,
}

impl ToolSet {
	/// Start building a set.
	pub fn builder() -> ToolSetBuilder {
		ToolSetBuilder::default()
	}

	/// Get a binding by name.
	pub fn get(&self, name: &str) -> Option<&ToolBinding> {
		self.bindings.get(name)
	}

	/// Whether a binding exists.
	pub fn contains(&self, name: &str) -> bool {
		self.bindings.contains_key(name)
	}

	/// Number of bindings.
	pub fn len(&self) -> usize {
		self.bindings.len()
	}

	/// Whether the set is empty.
	pub fn is_empty(&self) -> bool {
		self.bindings.is_empty()
	}

	/// All binding names, sorted.
	pub fn names(&self) -> Vec<&str> {
		let mut names: Vec<&str> = self.bindings.keys().map(String::as_str).collect();
		names.sort_unstable();
		names
	}

	/// All binding definitions.
	pub fn definitions(&self) -> Vec<&ToolDefinition> {
		self.bindings.values().map(ToolBinding::definition).collect()
	}

	/// Iterate over the bindings.
	pub fn iter(&self) -> impl Iterator<Item = &ToolBinding> {
		self.bindings.values()
	}

	/// The bound work units in this set, for capability-graph validation.
	pub fn bound_units(&self) -> Vec<Arc<dyn crate::unit::WorkUnit>> {
		self.bindings
			.values()
			.filter_map(|b| b.bound_unit().cloned())
			.collect()
	}
}

/// Builder for a [`ToolSet`]; rejects duplicate binding names.
#[derive(Debug, Default)]
pub struct ToolSetBuilder {
	bindings: Vec<ToolBinding>,
}

impl ToolSetBuilder {
	/// Add a binding.
	pub fn with(mut self, binding: ToolBinding) -> Self {
		self.bindings.push(binding);
		self
	}

	/// Finish the set, failing on duplicate names.
	pub fn build(self) -> Result<ToolSet, OrchestrationError> {
		let mut bindings = HashMap::with_capacity(self.bindings.len());
		for binding in self.bindings {
			let name = binding.name().to_string();
			if bindings.insert(name.clone(), binding).is_some() {
				return Err(OrchestrationError::invalid_composition(
					name,
					"duplicate tool binding name",
				));
			}
		}
		Ok(ToolSet {
			bindings: Arc::new(bindings),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::tooling::binding::tests_support::NullTool;

	fn binding(name: &str) -> ToolBinding {
		ToolBinding::function(ToolDefinition::new_simple(name, "test binding"), NullTool)
	}

	#[test]
	fn test_build_and_lookup() {
		let set = ToolSet::builder()
			.with(binding("ping"))
			.with(binding("status"))
			.build()
			.unwrap();

		assert_eq!(set.len(), 2);
		assert!(set.contains("ping"));
		assert!(set.get("status").is_some());
		assert!(set.get("missing").is_none());
		assert_eq!(set.names(), vec!["ping", "status"]);
	}

	#[test]
	fn test_duplicate_name_rejected() {
		let result = ToolSet::builder()
			.with(binding("ping"))
			.with(binding("ping"))
			.build();

		match result {
			Err(OrchestrationError::InvalidComposition { unit, message }) => {
				assert_eq!(unit, "ping");
				assert!(message.contains("duplicate"));
			}
			other => panic!("expected InvalidComposition, got {:?}", other),
		}
	}

	#[test]
	fn test_empty_set() {
		let set = ToolSet::default();
		assert!(set.is_empty());
		assert!(set.bound_units().is_empty());
	}
}
