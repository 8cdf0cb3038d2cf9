//! Session runner - drives one conversation against a root work unit.
//!
//! A [`SessionRunner`] owns the session's [`StateStore`], validates the
//! composition once, and runs turns: each call to [`run`](SessionRunner::run)
//! snapshots the store, invokes the root unit, applies the returned batch,
//! and assembles an [`ExecutionResult`]. State persists across turns and is
//! discarded with the runner; work unit definitions are immutable
//! configuration shared freely between sessions.
//!
//! [`run_session`] is the one-shot entry point for hosts that drive a single
//! turn.

use crate::composite::{enforce_output_contract, ensure_acyclic};
use crate::error::OrchestrationError;
use crate::observability::Logger;
use crate::state::{StateDelta, StateSnapshot, StateStore};
use crate::tooling::ToolInvoker;
use crate::unit::{ControlSignal, FailureReport, TerminationReason, WorkUnit};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// The outcome of one turn, immutable once returned.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// Identifier of the session that produced this result.
    pub session_id: String,
    /// Final output value of the root unit.
    pub output: Value,
    /// The state mutations applied during the turn.
    pub state_delta: StateDelta,
    /// Why the turn terminated.
    pub termination: TerminationReason,
    /// Children that failed inside partially-completed fan-outs.
    pub failures: Vec<FailureReport>,
    /// Whether an early exit asked for trailing summarization to be skipped.
    pub summarization_skipped: bool,
    /// When the turn started.
    pub started_at: DateTime<Utc>,
    /// When the turn finished.
    pub finished_at: DateTime<Utc>,
}

impl ExecutionResult {
    /// Whether the turn completed ordinarily with no partial failures.
    pub fn is_clean(&self) -> bool {
        self.termination.is_completed() && self.failures.is_empty()
    }
}

/// Drives one conversation: holds the store, accepts inputs, invokes the
/// root unit, and surfaces results.
pub struct SessionRunner {
    session_id: String,
    root: Arc<dyn WorkUnit>,
    store: StateStore,
    logger: Option<Logger>,
}

impl SessionRunner {
    /// Create a runner over an empty store.
    ///
    /// Validates the capability graph reachable from `root` acyclic; a
    /// defective composition is rejected here, before the first turn.
    pub fn new(root: Arc<dyn WorkUnit>) -> Result<Self, OrchestrationError> {
        Self::with_initial_state(root, HashMap::new())
    }

    /// Create a runner with initial state entries.
    pub fn with_initial_state(
        root: Arc<dyn WorkUnit>,
        initial: HashMap<String, Value>,
    ) -> Result<Self, OrchestrationError> {
        ensure_acyclic(&root)?;
        Ok(Self {
            session_id: Uuid::new_v4().to_string(),
            root,
            store: StateStore::with_initial(initial),
            logger: None,
        })
    }

    /// Attach a session logger.
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// The session identifier.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// The session's state store, e.g. for snapshotting between turns.
    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Run one turn against the root unit.
    ///
    /// On success the returned batch is applied to the store as one step.
    /// On failure the batch applied up to the failing child is still
    /// applied - partial state is retained by design - and the error names
    /// the failing unit and the path to it. A failure is never surfaced as
    /// a successful empty result.
    pub async fn run(&self, input: Value) -> Result<ExecutionResult, OrchestrationError> {
        let started_at = Utc::now();
        if let Some(logger) = &self.logger {
            if let Err(e) = logger.log_session_start(&self.session_id, self.root.name()) {
                tracing::warn!(error = %e, "session logger failed");
            }
        }

        tracing::debug!(
            session = %self.session_id,
            root = self.root.name(),
            "turn started"
        );

        let view = self.store.snapshot().await;
        let invoker = ToolInvoker::for_unit(self.root.as_ref());
        match self.root.invoke(input, view, &invoker).await {
            Ok(output) => {
                if let Err(e) = enforce_output_contract(self.root.as_ref(), &output) {
                    self.log_failure(&e);
                    return Err(e);
                }

                if !output.mutations.is_empty() {
                    self.store.apply(&output.mutations, self.root.name()).await;
                }

                let summarization_skipped = matches!(
                    output.signal,
                    ControlSignal::Exit {
                        skip_summarization: true
                    }
                );
                let termination = if output.signal.is_exit() && output.termination.is_completed() {
                    TerminationReason::EscalatedExit
                } else {
                    output.termination
                };

                if let Some(logger) = &self.logger {
                    let keys: Vec<String> =
                        output.mutations.keys().map(str::to_string).collect();
                    let failed: Vec<String> =
                        output.failures.iter().map(|f| f.unit.clone()).collect();
                    if let Err(e) = logger.log_turn(termination.as_str(), &keys, &failed) {
                        tracing::warn!(error = %e, "session logger failed");
                    }
                }

                tracing::debug!(
                    session = %self.session_id,
                    termination = %termination,
                    keys = output.mutations.len(),
                    "turn finished"
                );

                Ok(ExecutionResult {
                    session_id: self.session_id.clone(),
                    output: output.value,
                    state_delta: output.mutations,
                    termination,
                    failures: output.failures,
                    summarization_skipped,
                    started_at,
                    finished_at: Utc::now(),
                })
            }
            Err(e) => {
                if let Some(applied) = e.applied() {
                    if !applied.is_empty() {
                        self.store.apply(applied, self.root.name()).await;
                    }
                }
                self.log_failure(&e);
                Err(e)
            }
        }
    }

    /// Read the current state as an immutable snapshot.
    pub async fn state(&self) -> StateSnapshot {
        self.store.snapshot().await
    }

    fn log_failure(&self, error: &OrchestrationError) {
        tracing::warn!(session = %self.session_id, error = %error, "turn failed");
        if let Some(logger) = &self.logger {
            let path = match error {
                OrchestrationError::ChildFailure { path, .. } => path.clone(),
                _ => self.root.name().to_string(),
            };
            if let Err(e) = logger.log_failure(&path, &error.to_string()) {
                tracing::warn!(error = %e, "session logger failed");
            }
        }
    }
}

/// Run a single turn: the only call a host application makes into the core.
///
/// Builds a throwaway session over `initial_state`, invokes `root` with
/// `input`, and returns the result. Hosts keeping conversation state across
/// turns hold a [`SessionRunner`] instead.
pub async fn run_session(
    root: Arc<dyn WorkUnit>,
    initial_state: HashMap<String, Value>,
    input: Value,
) -> Result<ExecutionResult, OrchestrationError> {
    let runner = SessionRunner::with_initial_state(root, initial_state)?;
    runner.run(input).await
}
