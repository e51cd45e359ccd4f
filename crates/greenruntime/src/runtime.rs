use crate::compiler::CompiledGraph;
use crate::executor::{GraphExecutor, RunResult};
use crate::store::CheckpointStore;
use greencore::{Checkpoint, Decision, EngineError, EventBus, ExecutionEvent, RunId, RunState};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OwnedMutexGuard;

/// Main entry point for callers: start, resume, cancel and inspect runs.
///
/// Calls for the same `run_id` are serialized through a per-run lock, so
/// two callers racing on one run cannot both resume it. Distinct runs
/// proceed concurrently and share only the graph and the store.
pub struct WorkflowRuntime {
    executor: Arc<GraphExecutor>,
    event_bus: Arc<EventBus>,
    store: Arc<dyn CheckpointStore>,
    locks: Mutex<HashMap<RunId, Arc<tokio::sync::Mutex<()>>>>,
}

impl WorkflowRuntime {
    pub fn new(graph: CompiledGraph, store: Arc<dyn CheckpointStore>) -> Self {
        Self::with_config(graph, store, RuntimeConfig::default())
    }

    pub fn with_config(graph: CompiledGraph, store: Arc<dyn CheckpointStore>, config: RuntimeConfig) -> Self {
        let event_bus = Arc::new(EventBus::new(config.event_buffer_size));
        let executor = Arc::new(GraphExecutor::new(
            Arc::new(graph),
            store.clone(),
            event_bus.clone(),
            config.max_steps,
        ));

        Self {
            executor,
            event_bus,
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn graph(&self) -> &Arc<CompiledGraph> {
        self.executor.graph()
    }

    pub async fn start(&self, run_id: RunId, state: RunState) -> Result<RunResult, EngineError> {
        let _guard = self.lock(&run_id).await;
        self.executor.start(run_id, state).await
    }

    pub async fn resume(&self, run_id: &RunId, decision: Decision) -> Result<RunResult, EngineError> {
        let _guard = self.lock(run_id).await;
        self.executor.resume(run_id, decision).await
    }

    pub async fn cancel(&self, run_id: &RunId) -> Result<Checkpoint, EngineError> {
        let _guard = self.lock(run_id).await;
        self.executor.cancel(run_id).await
    }

    /// Latest checkpoint of a run
    pub async fn checkpoint(&self, run_id: &RunId) -> Result<Checkpoint, EngineError> {
        self.executor.load(run_id).await
    }

    pub async fn list_runs(&self) -> Result<Vec<RunId>, EngineError> {
        Ok(self.store.list().await?)
    }

    pub fn subscribe_events(&self) -> tokio::sync::broadcast::Receiver<ExecutionEvent> {
        self.event_bus.subscribe()
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    async fn lock(&self, run_id: &RunId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            // Drop locks nobody else is holding or waiting on.
            locks.retain(|_, l| Arc::strong_count(l) > 1);
            locks.entry(run_id.clone()).or_default().clone()
        };
        lock.lock_owned().await
    }
}

/// Configuration for the runtime
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Upper bound on node executions per start/resume call
    pub max_steps: usize,
    pub event_buffer_size: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_steps: 64,
            event_buffer_size: 1000,
        }
    }
}
