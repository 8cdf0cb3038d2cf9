//! Loop composite - bounded re-run of a child sequence.

use crate::composite::sequential::SequentialUnit;
use crate::error::OrchestrationError;
use crate::state::{StateDelta, StateSnapshot};
use crate::tooling::ToolInvoker;
use crate::unit::{ControlSignal, TerminationReason, UnitOutput, WorkUnit};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Repeats its child sequence up to an iteration cap.
///
/// Each iteration runs the children as a sequential pipeline; state threads
/// forward, so every iteration sees the writes of the previous one. A child
/// may terminate the loop early by returning an exit signal, which the loop
/// observes at the boundary after that child's step - never mid-step, and
/// the remaining children of that iteration do not run. Early exit
/// terminates with reason `escalated-exit`; exhausting the cap terminates
/// with `max-iterations-reached`, which is a normal termination unless the
/// loop was built with [`fail_when_exhausted`](LoopUnit::fail_when_exhausted).
///
/// A plain exit is absorbed here (enclosing pipelines continue after the
/// loop); an exit that also asks to skip summarization keeps propagating so
/// enclosing pipelines skip their trailing stages too.
pub struct LoopUnit {
    name: String,
    body: Arc<SequentialUnit>,
    max_iterations: u32,
    fail_when_exhausted: bool,
}

impl LoopUnit {
    /// Create a loop over the given children.
    ///
    /// Fails at composition time if `children` is empty or `max_iterations`
    /// is zero.
    pub fn new(
        name: impl Into<String>,
        children: Vec<Arc<dyn WorkUnit>>,
        max_iterations: u32,
    ) -> Result<Self, OrchestrationError> {
        let name = name.into();
        if children.is_empty() {
            return Err(OrchestrationError::invalid_composition(
                name,
                "loop requires at least one child",
            ));
        }
        if max_iterations == 0 {
            return Err(OrchestrationError::invalid_composition(
                name,
                "max_iterations must be at least 1",
            ));
        }
        let body = Arc::new(SequentialUnit::new(format!("{name}.body"), children));
        Ok(Self {
            name,
            body,
            max_iterations,
            fail_when_exhausted: false,
        })
    }

    /// Treat iteration exhaustion as the `IterationLimitReached` error
    /// instead of a normal termination.
    pub fn fail_when_exhausted(mut self) -> Self {
        self.fail_when_exhausted = true;
        self
    }

    /// The configured iteration cap.
    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }
}

#[async_trait]
impl WorkUnit for LoopUnit {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_composite(&self) -> bool {
        true
    }

    fn sub_units(&self) -> Vec<Arc<dyn WorkUnit>> {
        vec![self.body.clone() as Arc<dyn WorkUnit>]
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
        let mut failures = Vec::new();
        let invoker = ToolInvoker::for_unit(self.body.as_ref());

        for iteration in 1..=self.max_iterations {
            tracing::debug!(
                loop_ = %self.name,
                iteration,
                max = self.max_iterations,
                "loop iteration started"
            );

            let output = match self
                .body
                .invoke(input.clone(), view.clone(), &invoker)
                .await
            {
                Ok(output) => output,
                Err(e) => {
                    return Err(e.in_composite(&self.name, self.body.name(), 0, applied));
                }
            };

            view = view.overlay(&output.mutations);
            applied.merge(&output.mutations);
            value = output.value;
            failures.extend(output.failures);

            if let ControlSignal::Exit { skip_summarization } = output.signal {
                tracing::debug!(
                    loop_ = %self.name,
                    iteration,
                    "early exit signaled, terminating loop"
                );
                let signal = if skip_summarization {
                    output.signal
                } else {
                    ControlSignal::Continue
                };
                return Ok(UnitOutput {
                    value,
                    mutations: applied,
                    signal,
                    termination: TerminationReason::EscalatedExit,
                    failures,
                });
            }
        }

        if self.fail_when_exhausted {
            return Err(OrchestrationError::iteration_limit(
                &self.name,
                self.max_iterations,
            ));
        }

        Ok(UnitOutput {
            value,
            mutations: applied,
            signal: ControlSignal::Continue,
            termination: TerminationReason::MaxIterationsReached,
            failures,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composite::tests_support::ScriptedUnit;
    use serde_json::json;

    #[tokio::test]
    async fn test_runs_exactly_max_iterations_without_exit() {
        let validator = Arc::new(
            ScriptedUnit::new("validator", |count, _, _| {
                Ok(UnitOutput::keyed(
                    "validation_result",
                    json!(format!("NEEDS IMPROVEMENT (round {count})")),
                ))
            })
            .with_output_key("validation_result"),
        );
        let fixer = Arc::new(
            ScriptedUnit::new("fixer", |count, _, _| {
                Ok(UnitOutput::keyed("draft", json!(format!("v{count}"))))
            })
            .with_output_key("draft"),
        );
        let validator_probe = Arc::clone(&validator);
        let fixer_probe = Arc::clone(&fixer);

        let improve = LoopUnit::new("improve_loop", vec![validator, fixer], 3).unwrap();
        let output = improve
            .invoke(json!(null), StateSnapshot::empty(), &ToolInvoker::empty())
            .await
            .unwrap();

        assert_eq!(output.termination, TerminationReason::MaxIterationsReached);
        assert_eq!(validator_probe.invocations(), 3);
        assert_eq!(fixer_probe.invocations(), 3);
        assert_eq!(output.mutations.get("draft"), Some(&json!("v3")));
    }

    #[tokio::test]
    async fn test_early_exit_stops_at_step_boundary() {
        // The validator approves on the second iteration; the fixer must not
        // run again after the signal.
        let validator = Arc::new(
            ScriptedUnit::new("validator", |count, _, _| {
                let output =
                    UnitOutput::keyed("validation_result", json!(format!("round {count}")));
                if count >= 2 {
                    Ok(output.exit_loop(false))
                } else {
                    Ok(output)
                }
            })
            .with_output_key("validation_result"),
        );
        let fixer = Arc::new(
            ScriptedUnit::new("fixer", |count, _, _| {
                Ok(UnitOutput::keyed("draft", json!(format!("v{count}"))))
            })
            .with_output_key("draft"),
        );
        let validator_probe = Arc::clone(&validator);
        let fixer_probe = Arc::clone(&fixer);

        let improve = LoopUnit::new("improve_loop", vec![validator, fixer], 3).unwrap();
        let output = improve
            .invoke(json!(null), StateSnapshot::empty(), &ToolInvoker::empty())
            .await
            .unwrap();

        assert_eq!(output.termination, TerminationReason::EscalatedExit);
        assert_eq!(validator_probe.invocations(), 2);
        assert_eq!(fixer_probe.invocations(), 1);
        // Plain exit is absorbed; enclosing pipelines would continue.
        assert!(!output.signal.is_exit());
    }

    #[tokio::test]
    async fn test_state_threads_forward_between_iterations() {
        let counter = Arc::new(
            ScriptedUnit::new("counter", |_, _, state| {
                let n = state.get("n").and_then(Value::as_i64).unwrap_or(0);
                Ok(UnitOutput::keyed("n", json!(n + 1)))
            })
            .with_output_key("n"),
        );

        let counting = LoopUnit::new("counting", vec![counter], 4).unwrap();
        let output = counting
            .invoke(json!(null), StateSnapshot::empty(), &ToolInvoker::empty())
            .await
            .unwrap();

        assert_eq!(output.mutations.get("n"), Some(&json!(4)));
    }

    #[tokio::test]
    async fn test_child_failure_aborts_the_loop() {
        let flaky = Arc::new(ScriptedUnit::new("flaky", |count, _, _| {
            if count == 2 {
                Err(OrchestrationError::unit_failure("flaky", "gave up"))
            } else {
                Ok(UnitOutput::keyed("ok", json!(count)))
            }
        })
        .with_output_key("ok"));

        let looping = LoopUnit::new("looping", vec![flaky], 5).unwrap();
        let error = looping
            .invoke(json!(null), StateSnapshot::empty(), &ToolInvoker::empty())
            .await
            .unwrap_err();

        match &error {
            OrchestrationError::ChildFailure { unit, path, applied, .. } => {
                assert_eq!(unit, "flaky");
                assert_eq!(path, "looping/looping.body/flaky");
                // First iteration's write is retained.
                assert_eq!(applied.get("ok"), Some(&json!(1)));
            }
            other => panic!("expected ChildFailure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fail_when_exhausted() {
        let never_done = Arc::new(
            ScriptedUnit::new("never_done", |_, _, _| {
                Ok(UnitOutput::keyed("attempt", json!("again")))
            })
            .with_output_key("attempt"),
        );

        let strict = LoopUnit::new("strict", vec![never_done], 2)
            .unwrap()
            .fail_when_exhausted();
        let error = strict
            .invoke(json!(null), StateSnapshot::empty(), &ToolInvoker::empty())
            .await
            .unwrap_err();

        match error {
            OrchestrationError::IterationLimitReached { unit, limit } => {
                assert_eq!(unit, "strict");
                assert_eq!(limit, 2);
            }
            other => panic!("expected IterationLimitReached, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_zero_iterations_and_empty_body() {
        let child: Arc<dyn WorkUnit> = Arc::new(ScriptedUnit::new("noop", |_, _, _| {
            Ok(UnitOutput::text("ok"))
        }));
        assert!(LoopUnit::new("bad", vec![child], 0).is_err());
        assert!(LoopUnit::new("bad", Vec::new(), 3).is_err());
    }
}
