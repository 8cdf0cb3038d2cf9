//! Composition-time validation of the capability graph.

use crate::error::OrchestrationError;
use crate::unit::WorkUnit;
use std::sync::Arc;

/// Verify that the graph reachable from `root` is acyclic.
///
/// The graph covers composite children and unit-valued tool bindings: a
/// unit exposed as another unit's capability is a sub-call and must not be
/// able to re-enter itself. Sharing is fine (the same unit may appear under
/// several parents); revisiting a name along the current descent path is a
/// [`CycleDetected`](OrchestrationError::CycleDetected).
///
/// The session runner calls this once when it is built; it is public for
/// hosts that assemble compositions dynamically and want to validate early.
pub fn ensure_acyclic(root: &Arc<dyn WorkUnit>) -> Result<(), OrchestrationError> {
    let mut path = Vec::new();
    visit(root, &mut path)
}

fn visit(unit: &Arc<dyn WorkUnit>, path: &mut Vec<String>) -> Result<(), OrchestrationError> {
    let name = unit.name().to_string();
    if path.contains(&name) {
        let mut cycle = path.clone();
        cycle.push(name);
        return Err(OrchestrationError::cycle_detected(cycle.join("/")));
    }

    path.push(name);
    for child in unit.sub_units() {
        visit(&child, path)?;
    }
    for bound in unit.tool_set().bound_units() {
        visit(&bound, path)?;
    }
    path.pop();
    Ok(())
}
