//! Tool bindings - capabilities a work unit may invoke.
//!
//! A binding adapts either a typed async function or another work unit into
//! an invocable capability with a declared name, description, and parameter
//! schema. Units hold their bindings in a [`ToolSet`] and call them through
//! a [`ToolInvoker`] during `invoke`.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌───────────────────┐
//! │ async fn     │   │ WorkUnit-as-tool  │
//! └──────┬───────┘   └─────────┬─────────┘
//!        │                     │
//!        ▼                     ▼
//! ┌─────────────────────────────────────────┐
//! │               ToolBinding               │
//! │   definition + optional timeout + kind  │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │        ToolSet (built, duplicate-       │
//! │        checked, shared by clone)        │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │   ToolInvoker::call(name, arguments)    │
//! └─────────────────────────────────────────┘
//! ```
//!
//! A tool call is synchronous from the calling unit's perspective: the unit
//! suspends until the tool returns. Failures and timeouts come back as
//! `ToolInvocationFailure`; the calling unit decides whether to retry,
//! degrade, or fail. A unit bound as a tool receives the explicit call
//! arguments as its input and no ambient state; its result passes back
//! through the calling unit, never directly into the store.

mod binding;
mod definition;
mod invoker;
mod registry;

pub use binding::{ToolBinding, ToolFn};
pub use definition::ToolDefinition;
pub use invoker::ToolInvoker;
pub use registry::{ToolSet, ToolSetBuilder};

/// Generate function-calling schemas for every binding in a set.
///
/// Hosts exposing a unit's capabilities to a language model can hand these
/// straight to the provider.
pub fn function_schemas(set: &ToolSet) -> Vec<serde_json::Value> {
    set.definitions()
        .iter()
        .map(|def| def.to_function_schema())
        .collect()
}
