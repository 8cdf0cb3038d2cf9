//! Sequential composite - an ordered, fail-fast pipeline.

use crate::composite::enforce_output_contract;
use crate::error::OrchestrationError;
use crate::state::{StateDelta, StateSnapshot};
use crate::tooling::ToolInvoker;
use crate::unit::{ControlSignal, TerminationReason, UnitOutput, WorkUnit};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Runs an ordered list of children one after another.
///
/// Child *k*'s state view is taken strictly after child *k-1*'s batch is
/// applied, so every child sees all predecessor writes. On a child failure
/// the pipeline halts immediately and propagates the failure tagged with
/// the path and failing index; writes applied before the failure are
/// retained, mirroring that downstream consumers must tolerate
/// partially-completed pipelines.
///
/// An exit signal from a child stops the remaining children and propagates
/// upward so an enclosing loop can observe it at the step boundary.
pub struct SequentialUnit {
    name: String,
    children: Vec<Arc<dyn WorkUnit>>,
}

impl SequentialUnit {
    /// Create a pipeline over the given children.
    pub fn new(name: impl Into<String>, children: Vec<Arc<dyn WorkUnit>>) -> Self {
        Self {
            name: name.into(),
            children,
        }
    }

    /// The ordered children.
    pub fn children(&self) -> &[Arc<dyn WorkUnit>] {
        &self.children
    }
}

#[async_trait]
impl WorkUnit for SequentialUnit {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_composite(&self) -> bool {
        true
    }

    fn sub_units(&self) -> Vec<Arc<dyn WorkUnit>> {
        self.children.clone()
    }

    async fn invoke(
        &self,
        input: Value,
        state: StateSnapshot,
        _tools: &ToolInvoker,
    ) -> Result<UnitOutput, OrchestrationError> {
        let mut applied = StateDelta::new();
        let mut view = state;
        let mut value = Value::Null;
        let mut signal = ControlSignal::Continue;
        let mut termination = TerminationReason::Completed;
        let mut failures = Vec::new();

        for (index, child) in self.children.iter().enumerate() {
            tracing::debug!(
                pipeline = %self.name,
                child = child.name(),
                index,
                "pipeline step started"
            );

            let invoker = ToolInvoker::for_unit(child.as_ref());
            let output = match child.invoke(input.clone(), view.clone(), &invoker).await {
                Ok(output) => output,
                Err(e) => {
                    return Err(e.in_composite(&self.name, child.name(), index, applied));
                }
            };
            if let Err(e) = enforce_output_contract(child.as_ref(), &output) {
                return Err(e.in_composite(&self.name, child.name(), index, applied));
            }

            view = view.overlay(&output.mutations);
            applied.merge(&output.mutations);
            value = output.value;
            termination = output.termination;
            failures.extend(output.failures);

            if output.signal.is_exit() {
                tracing::debug!(
                    pipeline = %self.name,
                    child = child.name(),
                    "exit signaled, skipping remaining steps"
                );
                signal = output.signal;
                break;
            }
        }

        Ok(UnitOutput {
            value,
            mutations: applied,
            signal,
            termination,
            failures,
        })
    }
}
