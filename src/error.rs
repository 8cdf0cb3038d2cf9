//! Error taxonomy for the orchestration core.

use crate::state::StateDelta;
use thiserror::Error;

/// Errors raised while composing or executing work units.
///
/// Sequential and router composites fail fast and propagate the first
/// failure upward untouched, tagging it with the path of composite/child
/// names that led to it. Parallel composites never fail fast: child failures
/// are collected per child and only a same-key write conflict aborts the
/// merge. Loop composites treat iteration exhaustion as a normal termination
/// unless explicitly configured otherwise.
#[derive(Debug, Error)]
pub enum OrchestrationError {
    /// A child work unit raised a typed failure during `invoke`.
    ///
    /// Carries the failing unit's name, its index in the parent composite,
    /// the path from the outermost composite down to the failure, and the
    /// state batch applied before the failure (partial state is retained by
    /// design; there is no rollback).
    #[error("unit '{unit}' failed at {path}: {source}")]
    ChildFailure {
        /// Name of the failing unit.
        unit: String,
        /// Index of the failing child in its parent composite.
        index: usize,
        /// Slash-joined composite/child names leading to the failure.
        path: String,
        /// The underlying cause, propagated untouched.
        source: Box<OrchestrationError>,
        /// Writes applied before the failure, retained for the caller.
        applied: StateDelta,
    },

    /// A work unit implementation reported a failure of its own step.
    #[error("unit '{unit}' failed: {message}")]
    UnitFailure {
        /// Name of the failing unit.
        unit: String,
        /// Description of the failure.
        message: String,
    },

    /// Two parallel children wrote the same key in one step.
    ///
    /// Silent overwrite would hide a design defect in the child set, so the
    /// merge is aborted and neither write is applied.
    #[error("conflicting writes to state key '{key}' from units {writers:?}")]
    StateConflict {
        /// The contested key.
        key: String,
        /// Names of the units that wrote it.
        writers: Vec<String>,
    },

    /// Composition-time validation found a cycle in the capability graph.
    #[error("capability graph cycle detected: {path}")]
    CycleDetected {
        /// Slash-joined names from the cycle entry back to itself.
        path: String,
    },

    /// A router's classifier produced a category no specialist is
    /// configured for, and the router was built to fail rather than ask for
    /// clarification.
    #[error("no route configured for category '{category}'")]
    RouteUnmatched {
        /// The unmatched classifier output.
        category: String,
    },

    /// A loop exhausted its iteration cap without an early-exit signal.
    ///
    /// Only raised by loops built with `fail_when_exhausted`; by default
    /// exhaustion is the normal `max-iterations-reached` termination.
    #[error("loop '{unit}' reached its iteration limit of {limit}")]
    IterationLimitReached {
        /// Name of the loop composite.
        unit: String,
        /// The configured iteration cap.
        limit: u32,
    },

    /// An external tool call failed or timed out.
    #[error("tool '{tool}' invocation failed: {message}")]
    ToolInvocationFailure {
        /// Name of the tool binding.
        tool: String,
        /// Description of the failure.
        message: String,
    },

    /// A composite was declared with an invalid shape (duplicate route
    /// category, zero iteration cap, and similar).
    #[error("invalid composition for '{unit}': {message}")]
    InvalidComposition {
        /// Name of the unit being composed.
        unit: String,
        /// Description of the defect.
        message: String,
    },
}

impl OrchestrationError {
    /// Create a UnitFailure.
    pub fn unit_failure(unit: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UnitFailure {
            unit: unit.into(),
            message: message.into(),
        }
    }

    /// Create a StateConflict for `key` written by `writers`.
    pub fn state_conflict(key: impl Into<String>, writers: Vec<String>) -> Self {
        Self::StateConflict {
            key: key.into(),
            writers,
        }
    }

    /// Create a CycleDetected with the offending path.
    pub fn cycle_detected(path: impl Into<String>) -> Self {
        Self::CycleDetected { path: path.into() }
    }

    /// Create a RouteUnmatched for a classifier output.
    pub fn route_unmatched(category: impl Into<String>) -> Self {
        Self::RouteUnmatched {
            category: category.into(),
        }
    }

    /// Create an IterationLimitReached.
    pub fn iteration_limit(unit: impl Into<String>, limit: u32) -> Self {
        Self::IterationLimitReached {
            unit: unit.into(),
            limit,
        }
    }

    /// Create a ToolInvocationFailure.
    pub fn tool_failure(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolInvocationFailure {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create an InvalidComposition.
    pub fn invalid_composition(unit: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidComposition {
            unit: unit.into(),
            message: message.into(),
        }
    }

    /// Tag a child failure with its parent composite.
    ///
    /// A failure already wrapped as [`ChildFailure`](Self::ChildFailure) is
    /// propagated untouched apart from extending its path and folding in the
    /// writes the parent had applied before the failing child; any other
    /// error is wrapped fresh.
    pub fn in_composite(
        self,
        parent: &str,
        child: &str,
        index: usize,
        applied_before: StateDelta,
    ) -> Self {
        match self {
            Self::ChildFailure {
                unit,
                index: inner_index,
                path,
                source,
                applied,
            } => {
                let mut combined = applied_before;
                combined.merge(&applied);
                Self::ChildFailure {
                    unit,
                    index: inner_index,
                    path: format!("{}/{}", parent, path),
                    source,
                    applied: combined,
                }
            }
            other => Self::ChildFailure {
                unit: child.to_string(),
                index,
                path: format!("{}/{}", parent, child),
                source: Box::new(other),
                applied: applied_before,
            },
        }
    }

    /// The state batch retained by a failure, if any.
    pub fn applied(&self) -> Option<&StateDelta> {
        match self {
            Self::ChildFailure { applied, .. } => Some(applied),
            _ => None,
        }
    }
}
