//! Parallel composite - concurrent fan-out over one shared snapshot.

use crate::composite::enforce_output_contract;
use crate::error::OrchestrationError;
use crate::state::{StateDelta, StateSnapshot};
use crate::tooling::ToolInvoker;
use crate::unit::{ControlSignal, FailureReport, TerminationReason, UnitOutput, WorkUnit};
use async_trait::async_trait;
use futures_util::future::join_all;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Runs all children concurrently against the same state snapshot.
///
/// Children are spawned as independent tasks and cannot observe each
/// other's writes mid-flight; their batches are merged only at the join.
/// Disjoint keys merge trivially. A key written by more than one child is a
/// detected [`StateConflict`](OrchestrationError::StateConflict) - silent
/// last-write-wins would hide a design defect in the child set, so none of
/// the fan-out's writes are applied.
///
/// The composite never fails fast on a child failure: failed children are
/// collected into [`FailureReport`]s and the fan-out completes with the
/// survivors' merged writes. An optional per-child timeout cancels only the
/// child that exceeded it and records the timeout as that child's failure.
pub struct ParallelUnit {
    name: String,
    children: Vec<Arc<dyn WorkUnit>>,
    child_timeout: Option<Duration>,
}

impl ParallelUnit {
    /// Create a fan-out over the given children.
    pub fn new(name: impl Into<String>, children: Vec<Arc<dyn WorkUnit>>) -> Self {
        Self {
            name: name.into(),
            children,
            child_timeout: None,
        }
    }

    /// Set a per-child timeout.
    pub fn with_child_timeout(mut self, timeout: Duration) -> Self {
        self.child_timeout = Some(timeout);
        self
    }

    /// The children of this fan-out.
    pub fn children(&self) -> &[Arc<dyn WorkUnit>] {
        &self.children
    }
}

#[async_trait]
impl WorkUnit for ParallelUnit {
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
        let mut handles = Vec::with_capacity(self.children.len());
        for child in &self.children {
            let child = Arc::clone(child);
            let input = input.clone();
            let view = state.clone();
            let limit = self.child_timeout;

            handles.push(tokio::spawn(async move {
                let invoker = ToolInvoker::for_unit(child.as_ref());
                match limit {
                    Some(limit) => {
                        match tokio::time::timeout(limit, child.invoke(input, view, &invoker)).await
                        {
                            Ok(result) => result,
                            Err(_) => Err(OrchestrationError::unit_failure(
                                child.name(),
                                format!("timed out after {}s", limit.as_secs()),
                            )),
                        }
                    }
                    None => child.invoke(input, view, &invoker).await,
                }
            }));
        }

        let joined = join_all(handles).await;

        let mut outputs: Vec<(String, UnitOutput)> = Vec::new();
        let mut failures: Vec<FailureReport> = Vec::new();
        for (child, join_result) in self.children.iter().zip(joined) {
            match join_result {
                Ok(Ok(output)) => match enforce_output_contract(child.as_ref(), &output) {
                    Ok(()) => outputs.push((child.name().to_string(), output)),
                    Err(e) => failures.push(FailureReport {
                        unit: child.name().to_string(),
                        error: e.to_string(),
                    }),
                },
                Ok(Err(e)) => failures.push(FailureReport {
                    unit: child.name().to_string(),
                    error: e.to_string(),
                }),
                Err(e) => failures.push(FailureReport {
                    unit: child.name().to_string(),
                    error: format!("task panicked: {e}"),
                }),
            }
        }

        if !failures.is_empty() {
            tracing::warn!(
                fan_out = %self.name,
                failed = failures.len(),
                total = self.children.len(),
                "fan-out completed with child failures"
            );
        }

        // Same-key writes across children are a composition defect, not a
        // race to be resolved by completion order.
        let mut writers: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        for (name, output) in &outputs {
            for key in output.mutations.keys() {
                writers.entry(key).or_default().push(name.clone());
            }
        }
        if let Some((key, names)) = writers.into_iter().find(|(_, names)| names.len() > 1) {
            return Err(OrchestrationError::state_conflict(key, names));
        }

        let mut merged = StateDelta::new();
        let mut values = serde_json::Map::new();
        let mut signal = ControlSignal::Continue;
        for (name, output) in outputs {
            merged.merge(&output.mutations);
            values.insert(name, output.value);
            if let ControlSignal::Exit { skip_summarization } = output.signal {
                let already = matches!(
                    signal,
                    ControlSignal::Exit {
                        skip_summarization: true
                    }
                );
                signal = ControlSignal::Exit {
                    skip_summarization: skip_summarization || already,
                };
            }
            failures.extend(output.failures);
        }

        Ok(UnitOutput {
            value: Value::Object(values),
            mutations: merged,
            signal,
            termination: TerminationReason::Completed,
            failures,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composite::tests_support::ScriptedUnit;
    use serde_json::json;

    fn keyed_writer(name: &'static str, key: &'static str, value: Value) -> Arc<ScriptedUnit> {
        Arc::new(
            ScriptedUnit::new(name, move |_, _, _| {
                Ok(UnitOutput::keyed(key, value.clone()))
            })
            .with_output_key(key),
        )
    }

    #[tokio::test]
    async fn test_disjoint_writes_merge() {
        let fan_out = ParallelUnit::new(
            "architects",
            vec![
                keyed_writer("gcp", "gcp_proposal", json!("use GKE")),
                keyed_writer("aws", "aws_proposal", json!("use EKS")),
                keyed_writer("k8s", "k8s_proposal", json!("use kubeadm")),
            ],
        );

        let output = fan_out
            .invoke(json!("design a platform"), StateSnapshot::empty(), &ToolInvoker::empty())
            .await
            .unwrap();

        assert_eq!(output.mutations.len(), 3);
        assert_eq!(output.mutations.get("aws_proposal"), Some(&json!("use EKS")));
        assert_eq!(output.value["gcp"], json!("use GKE"));
        assert!(output.failures.is_empty());
    }

    #[tokio::test]
    async fn test_same_key_write_is_conflict() {
        let fan_out = ParallelUnit::new(
            "architects",
            vec![
                keyed_writer("gcp", "proposal", json!("use GKE")),
                keyed_writer("aws", "proposal", json!("use EKS")),
            ],
        );

        let error = fan_out
            .invoke(json!(null), StateSnapshot::empty(), &ToolInvoker::empty())
            .await
            .unwrap_err();

        match error {
            OrchestrationError::StateConflict { key, mut writers } => {
                writers.sort();
                assert_eq!(key, "proposal");
                assert_eq!(writers, vec!["aws".to_string(), "gcp".to_string()]);
            }
            other => panic!("expected StateConflict, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_child_failure_does_not_cancel_siblings() {
        let ok = keyed_writer("ok", "p", json!(1));
        let ok_probe = Arc::clone(&ok);
        let failing = Arc::new(ScriptedUnit::new("failing", |_, _, _| {
            Err(OrchestrationError::unit_failure("failing", "boom"))
        }));

        let fan_out = ParallelUnit::new("fan_out", vec![ok, failing]);
        let output = fan_out
            .invoke(json!(null), StateSnapshot::empty(), &ToolInvoker::empty())
            .await
            .unwrap();

        assert_eq!(ok_probe.invocations(), 1);
        assert_eq!(output.mutations.get("p"), Some(&json!(1)));
        assert_eq!(output.failures.len(), 1);
        assert_eq!(output.failures[0].unit, "failing");
        assert!(output.failures[0].error.contains("boom"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_that_childs_failure() {
        struct Sleeper;
        #[async_trait]
        impl WorkUnit for Sleeper {
            fn name(&self) -> &str {
                "sleeper"
            }
            async fn invoke(
                &self,
                _input: Value,
                _state: StateSnapshot,
                _tools: &ToolInvoker,
            ) -> Result<UnitOutput, OrchestrationError> {
                tokio::time::sleep(Duration::from_secs(120)).await;
                Ok(UnitOutput::text("late"))
            }
        }

        let fast = keyed_writer("fast", "q", json!(2));
        let fan_out = ParallelUnit::new("fan_out", vec![Arc::new(Sleeper), fast])
            .with_child_timeout(Duration::from_secs(1));

        let output = fan_out
            .invoke(json!(null), StateSnapshot::empty(), &ToolInvoker::empty())
            .await
            .unwrap();

        assert_eq!(output.failures.len(), 1);
        assert_eq!(output.failures[0].unit, "sleeper");
        assert!(output.failures[0].error.contains("timed out"));
        assert_eq!(output.mutations.get("q"), Some(&json!(2)));
    }
}
