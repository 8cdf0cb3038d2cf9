//! Agent Orchestration Kit (AOK) - composable building blocks for agent
//! workflows
//!
//! AOK provides a set of feature-gated modules for composing opaque work
//! units into orchestrated sessions:
//!
//! - **`state`** - session-scoped shared state with snapshots and batched
//!   writes
//! - **`unit`** - the work unit contract (output keys, shapes, signals)
//! - **`tooling`** - tool bindings, definitions, and the tool invoker
//! - **`composite`** - sequential, parallel, loop, and router composites
//! - **`session`** - the session runner and execution results
//! - **`config`** - configuration and environment loading
//! - **`observability`** - session logging
//! - **`executor`** - command execution for shell-backed tool functions
//!
//! # Features
//!
//! Everything is enabled by default; slim builds pick modules explicitly:
//!
//! ```toml
//! [dependencies]
//! aok = { version = "0.3", default-features = false, features = ["composite"] }
//! ```
//!
//! # Example: a pipeline over shared state
//!
//! ```ignore
//! use aok::prelude::*;
//! use std::sync::Arc;
//!
//! // classify -> generate -> format, each stage reading its predecessors'
//! // writes through the session state store.
//! let pipeline = Arc::new(SequentialUnit::new(
//!     "command_helper",
//!     vec![intent, command_generator, formatter],
//! ));
//!
//! let result = run_session(pipeline, Default::default(), input).await?;
//! println!("{} ({})", result.output, result.termination);
//! ```
//!
//! # Example: bounded improvement loop
//!
//! ```ignore
//! use aok::composite::{LoopUnit, SequentialUnit};
//!
//! // validate/fix until the validator signals an early exit, at most 3
//! // rounds; the loop terminates with `escalated-exit` or
//! // `max-iterations-reached`.
//! let improve = LoopUnit::new("improve_loop", vec![validator, fixer], 3)?;
//! ```

#![warn(missing_docs)]

/// Error taxonomy (enabled with the `state` feature)
#[cfg(feature = "state")]
pub mod error;

/// Session-scoped shared state (enabled with the `state` feature)
#[cfg(feature = "state")]
pub mod state;

/// Work unit contract (enabled with the `unit` feature)
#[cfg(feature = "unit")]
pub mod unit;

/// Tool bindings and invocation (enabled with the `tooling` feature)
#[cfg(feature = "tooling")]
pub mod tooling;

/// Workflow composites (enabled with the `composite` feature)
#[cfg(feature = "composite")]
pub mod composite;

/// Session runner (enabled with the `session` feature)
#[cfg(feature = "session")]
pub mod session;

/// Configuration management (enabled with the `config` feature)
#[cfg(feature = "config")]
pub mod config;

/// Observability utilities (enabled with the `observability` feature)
#[cfg(feature = "observability")]
pub mod observability;

/// Command execution (enabled with the `executor` feature)
#[cfg(feature = "executor")]
pub mod executor;

/// Prelude module for convenient imports
pub mod prelude {
    #[cfg(feature = "state")]
    pub use crate::error::OrchestrationError;
    #[cfg(feature = "state")]
    pub use crate::state::{StateDelta, StateSnapshot, StateStore};

    #[cfg(feature = "unit")]
    pub use crate::unit::{
        ControlSignal, FailureReport, FieldSpec, OutputShape, TerminationReason, UnitOutput,
        ValueKind,
    };

    #[cfg(feature = "tooling")]
    pub use crate::tooling::{ToolBinding, ToolDefinition, ToolFn, ToolInvoker, ToolSet};
    #[cfg(feature = "tooling")]
    pub use crate::unit::WorkUnit;

    #[cfg(feature = "composite")]
    pub use crate::composite::{
        ensure_acyclic, LoopUnit, ParallelUnit, RouteFallback, RouterUnit, SequentialUnit,
    };

    #[cfg(feature = "session")]
    pub use crate::session::{run_session, ExecutionResult, SessionRunner};

    #[cfg(feature = "config")]
    pub use crate::config::{Configuration, ConfigurationLoader, EnvironmentLoader};

    #[cfg(feature = "observability")]
    pub use crate::observability::Logger;

    #[cfg(feature = "executor")]
    pub use crate::executor::CommandExecutor;
}
