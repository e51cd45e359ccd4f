use crate::compiler::CompiledGraph;
use crate::store::CheckpointStore;
use chrono::Utc;
use greencore::{
    Checkpoint, CheckpointStatus, Decision, EngineError, EventBus, ExecutionEvent, NodeContext,
    NodeError, RunFailure, RunId, RunState,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// Outcome of driving a run until it can go no further
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum RunResult {
    /// Waiting at the interrupt node for a decision
    Suspended(RunId),
    Completed(RunState),
    Failed(RunFailure),
}

impl RunResult {
    pub fn is_suspended(&self) -> bool {
        matches!(self, RunResult::Suspended(_))
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, RunResult::Completed(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, RunResult::Failed(_))
    }

    pub fn completed_state(&self) -> Option<&RunState> {
        match self {
            RunResult::Completed(state) => Some(state),
            _ => None,
        }
    }
}

/// Drives compiled graphs one node at a time, checkpointing after every
/// step and returning control at the interrupt node.
///
/// The executor never waits for a human: a suspended run is only a stored
/// checkpoint until [`GraphExecutor::resume`] is called, possibly from a
/// different process. It assumes at most one caller per `run_id` at a time.
pub struct GraphExecutor {
    graph: Arc<CompiledGraph>,
    store: Arc<dyn CheckpointStore>,
    event_bus: Arc<EventBus>,
    max_steps: usize,
}

impl GraphExecutor {
    pub fn new(
        graph: Arc<CompiledGraph>,
        store: Arc<dyn CheckpointStore>,
        event_bus: Arc<EventBus>,
        max_steps: usize,
    ) -> Self {
        Self {
            graph,
            store,
            event_bus,
            max_steps,
        }
    }

    pub fn graph(&self) -> &Arc<CompiledGraph> {
        &self.graph
    }

    /// Start a fresh run from the graph's start node.
    ///
    /// A decision already present in `state` is consumed at the first
    /// approval point instead of suspending there.
    pub async fn start(&self, run_id: RunId, state: RunState) -> Result<RunResult, EngineError> {
        state.validate(false)?;
        if self.store.get(&run_id).await?.is_some() {
            return Err(EngineError::RunExists(run_id));
        }

        let checkpoint = Checkpoint::new(run_id.clone(), state, self.graph.start());
        self.store.put(&checkpoint).await?;

        tracing::info!(run_id = %run_id, graph = %self.graph.definition().name, "run started");
        self.event_bus.emit(ExecutionEvent::RunStarted {
            run_id,
            timestamp: Utc::now(),
        });

        self.drive(checkpoint, None).await
    }

    /// Continue a suspended run with the reviewer's decision
    pub async fn resume(&self, run_id: &RunId, decision: Decision) -> Result<RunResult, EngineError> {
        let mut checkpoint = self.load(run_id).await?;
        match checkpoint.status {
            CheckpointStatus::Interrupted => {}
            CheckpointStatus::Cancelled => return Err(EngineError::RunCancelled(run_id.clone())),
            status => {
                return Err(EngineError::NotSuspended {
                    run_id: run_id.clone(),
                    status,
                })
            }
        }
        checkpoint.state.validate(true)?;

        checkpoint.mark(CheckpointStatus::Running);

        tracing::info!(run_id = %run_id, decision = %decision, "run resumed");
        self.event_bus.emit(ExecutionEvent::RunResumed {
            run_id: run_id.clone(),
            decision,
            timestamp: Utc::now(),
        });

        self.drive(checkpoint, Some(decision)).await
    }

    /// Mark a run cancelled so that later resumes are refused.
    ///
    /// Cancelling twice is harmless; cancelling a finished run is an error.
    pub async fn cancel(&self, run_id: &RunId) -> Result<Checkpoint, EngineError> {
        let mut checkpoint = self.load(run_id).await?;
        match checkpoint.status {
            CheckpointStatus::Cancelled => return Ok(checkpoint),
            status @ (CheckpointStatus::Completed | CheckpointStatus::Failed) => {
                return Err(EngineError::RunFinished {
                    run_id: run_id.clone(),
                    status,
                })
            }
            CheckpointStatus::Running | CheckpointStatus::Interrupted => {}
        }

        checkpoint.mark(CheckpointStatus::Cancelled);
        self.store.put(&checkpoint).await?;

        tracing::info!(run_id = %run_id, "run cancelled");
        self.event_bus.emit(ExecutionEvent::RunCancelled {
            run_id: run_id.clone(),
            timestamp: Utc::now(),
        });
        Ok(checkpoint)
    }

    pub async fn load(&self, run_id: &RunId) -> Result<Checkpoint, EngineError> {
        self.store
            .get(run_id)
            .await?
            .ok_or_else(|| EngineError::CheckpointNotFound(run_id.clone()))
    }

    /// The run loop. `checkpoint` is always the last persisted snapshot;
    /// a resume decision only enters the working state.
    async fn drive(&self, mut checkpoint: Checkpoint, decision: Option<Decision>) -> Result<RunResult, EngineError> {
        let run_id = checkpoint.run_id.clone();
        let mut state = checkpoint.state.clone();
        if decision.is_some() {
            state.decision = decision;
        }
        let Some(mut current) = checkpoint.pending_node.clone() else {
            return Err(EngineError::NotSuspended {
                run_id,
                status: checkpoint.status,
            });
        };
        let mut steps = 0usize;

        loop {
            if steps >= self.max_steps {
                let error = NodeError::ExecutionFailed(format!(
                    "step limit of {} reached without reaching '{}'",
                    self.max_steps,
                    self.graph.terminal()
                ));
                return self.fail(checkpoint, &current, error).await;
            }
            steps += 1;

            let Some(node) = self.graph.node(&current) else {
                let error = NodeError::ExecutionFailed(format!("node '{current}' is not in the graph"));
                return self.fail(checkpoint, &current, error).await;
            };

            self.event_bus.emit(ExecutionEvent::NodeStarted {
                run_id: run_id.clone(),
                node: current.clone(),
                timestamp: Utc::now(),
            });

            let ctx = NodeContext::new(
                run_id.clone(),
                current.clone(),
                self.event_bus.create_emitter(run_id.clone(), current.clone()),
            );
            let started = Instant::now();
            let next_state = match node.execute(state.clone(), &ctx).await {
                Ok(next_state) => next_state,
                Err(error) => return self.fail(checkpoint, &current, error).await,
            };
            let duration_ms = started.elapsed().as_millis() as u64;

            if next_state.telemetry != state.telemetry {
                let error = NodeError::ExecutionFailed("node modified read-only telemetry".to_string());
                return self.fail(checkpoint, &current, error).await;
            }
            if let Err(invalid) = next_state.validate(true) {
                let error = NodeError::ExecutionFailed(format!("node left an invalid state: {invalid}"));
                return self.fail(checkpoint, &current, error).await;
            }
            state = next_state;

            if current == self.graph.terminal() {
                // A decision nobody consumed does not outlive the run.
                state.decision = None;
                let previous = checkpoint.clone();
                checkpoint.advance(state.clone(), None, CheckpointStatus::Completed);
                self.persist(&checkpoint, previous, &current).await?;

                self.event_bus.emit(ExecutionEvent::NodeCompleted {
                    run_id: run_id.clone(),
                    node: current.clone(),
                    next: None,
                    duration_ms,
                    timestamp: Utc::now(),
                });
                tracing::info!(run_id = %run_id, revision_count = state.revision_count, "run completed");
                self.event_bus.emit(ExecutionEvent::RunCompleted {
                    run_id,
                    timestamp: Utc::now(),
                });
                return Ok(RunResult::Completed(state));
            }

            let Some(next) = self.graph.next(&current, &state).map(str::to_string) else {
                let candidates = self.graph.router().candidates(&current).join(", ");
                let error = NodeError::ExecutionFailed(format!(
                    "no route from '{current}' matched (candidates: {candidates})"
                ));
                return self.fail(checkpoint, &current, error).await;
            };
            tracing::debug!(run_id = %run_id, from = %current, to = %next, "routed");

            let suspend = next == self.graph.interrupt() && state.decision.is_none();
            let status = if suspend {
                CheckpointStatus::Interrupted
            } else {
                CheckpointStatus::Running
            };
            let previous = checkpoint.clone();
            checkpoint.advance(state.clone(), Some(next.clone()), status);
            self.persist(&checkpoint, previous, &current).await?;

            self.event_bus.emit(ExecutionEvent::NodeCompleted {
                run_id: run_id.clone(),
                node: current.clone(),
                next: Some(next.clone()),
                duration_ms,
                timestamp: Utc::now(),
            });

            if suspend {
                tracing::info!(
                    run_id = %run_id,
                    node = %next,
                    revision_count = state.revision_count,
                    "run suspended awaiting decision"
                );
                self.event_bus.emit(ExecutionEvent::RunSuspended {
                    run_id: run_id.clone(),
                    node: next,
                    revision_count: state.revision_count,
                    timestamp: Utc::now(),
                });
                return Ok(RunResult::Suspended(run_id));
            }

            current = next;
        }
    }

    /// Write a step's checkpoint. If the write fails, the previously
    /// persisted snapshot is marked failed on a best-effort basis.
    async fn persist(&self, checkpoint: &Checkpoint, previous: Checkpoint, node: &str) -> Result<(), EngineError> {
        let Err(e) = self.store.put(checkpoint).await else {
            return Ok(());
        };
        tracing::error!(run_id = %checkpoint.run_id, node = %node, error = %e, "checkpoint write failed");

        let error = NodeError::ExecutionFailed(format!("checkpoint write failed: {e}"));
        if let Err(mark) = self.fail(previous, node, error).await {
            tracing::warn!(run_id = %checkpoint.run_id, error = %mark, "could not record failure either");
        }
        Err(e.into())
    }

    /// Record a failure on the last valid checkpoint without replacing its
    /// snapshot.
    async fn fail(&self, mut checkpoint: Checkpoint, node: &str, error: NodeError) -> Result<RunResult, EngineError> {
        let failure = RunFailure {
            run_id: checkpoint.run_id.clone(),
            node: node.to_string(),
            revision_count: checkpoint.state.revision_count,
            error,
        };
        tracing::error!(
            run_id = %failure.run_id,
            node = %failure.node,
            revision_count = failure.revision_count,
            error = %failure.error,
            "run failed"
        );

        checkpoint.mark_failed(failure.clone());
        self.store.put(&checkpoint).await?;

        self.event_bus.emit(ExecutionEvent::NodeFailed {
            run_id: failure.run_id.clone(),
            node: failure.node.clone(),
            error: failure.error.to_string(),
            timestamp: Utc::now(),
        });
        self.event_bus.emit(ExecutionEvent::RunFailed {
            run_id: failure.run_id.clone(),
            node: failure.node.clone(),
            reason: failure.to_string(),
            timestamp: Utc::now(),
        });
        Ok(RunResult::Failed(failure))
    }
}
