//! Workflow composites - control-flow policies over work units.
//!
//! A composite is itself a work unit built from children:
//!
//! - [`SequentialUnit`] runs an ordered list, each child seeing the writes
//!   of all predecessors, failing fast.
//! - [`ParallelUnit`] fans children out concurrently over one shared
//!   snapshot and merges their disjoint writes at the join.
//! - [`LoopUnit`] re-runs its child sequence up to an iteration cap or an
//!   early-exit signal.
//! - [`RouterUnit`] classifies the input and delegates to exactly one
//!   specialist from a closed route table.
//!
//! Children may themselves be composites; the structure is a tree,
//! validated acyclic (together with unit-valued tool bindings) by
//! [`validate::ensure_acyclic`] when a session is built.

pub mod loop_;
pub mod parallel;
pub mod router;
pub mod sequential;
pub mod validate;

pub use loop_::LoopUnit;
pub use parallel::ParallelUnit;
pub use router::{RouteFallback, RouterBuilder, RouterUnit};
pub use sequential::SequentialUnit;
pub use validate::ensure_acyclic;

use crate::error::OrchestrationError;
use crate::unit::{UnitOutput, WorkUnit};

/// Check a unit's returned output against its declarations.
///
/// Leaf units must write exactly their declared output key (and must write
/// it on success); composites relay already-validated child batches and are
/// exempt from the key check. Structured output shapes are validated for
/// everyone. A violation is surfaced as the unit's own typed failure.
pub(crate) fn enforce_output_contract(
    unit: &dyn WorkUnit,
    output: &UnitOutput,
) -> Result<(), OrchestrationError> {
    if !unit.is_composite() {
        match unit.output_key() {
            Some(key) => {
                if !output.mutations.contains(key) {
                    return Err(OrchestrationError::unit_failure(
                        unit.name(),
                        format!("declared output key '{key}' missing from returned mutations"),
                    ));
                }
                if let Some(extra) = output.mutations.keys().find(|k| *k != key) {
                    return Err(OrchestrationError::unit_failure(
                        unit.name(),
                        format!("write to undeclared state key '{extra}'"),
                    ));
                }
            }
            None => {
                if let Some(key) = output.mutations.keys().next() {
                    return Err(OrchestrationError::unit_failure(
                        unit.name(),
                        format!("write to undeclared state key '{key}'"),
                    ));
                }
            }
        }
    }

    unit.output_shape()
        .validate(&output.value)
        .map_err(|reason| {
            OrchestrationError::unit_failure(
                unit.name(),
                format!("output shape violation: {reason}"),
            )
        })
}
