use crate::{Decision, RunId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Events emitted while runs execute
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ExecutionEvent {
    RunStarted {
        run_id: RunId,
        timestamp: DateTime<Utc>,
    },
    RunResumed {
        run_id: RunId,
        decision: Decision,
        timestamp: DateTime<Utc>,
    },
    NodeStarted {
        run_id: RunId,
        node: String,
        timestamp: DateTime<Utc>,
    },
    NodeCompleted {
        run_id: RunId,
        node: String,
        next: Option<String>,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    NodeFailed {
        run_id: RunId,
        node: String,
        error: String,
        timestamp: DateTime<Utc>,
    },
    RunSuspended {
        run_id: RunId,
        node: String,
        revision_count: u32,
        timestamp: DateTime<Utc>,
    },
    RunCompleted {
        run_id: RunId,
        timestamp: DateTime<Utc>,
    },
    RunFailed {
        run_id: RunId,
        node: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    RunCancelled {
        run_id: RunId,
        timestamp: DateTime<Utc>,
    },
    NodeEvent {
        run_id: RunId,
        node: String,
        event: NodeEvent,
        timestamp: DateTime<Utc>,
    },
}

impl ExecutionEvent {
    pub fn run_id(&self) -> &RunId {
        match self {
            ExecutionEvent::RunStarted { run_id, .. }
            | ExecutionEvent::RunResumed { run_id, .. }
            | ExecutionEvent::NodeStarted { run_id, .. }
            | ExecutionEvent::NodeCompleted { run_id, .. }
            | ExecutionEvent::NodeFailed { run_id, .. }
            | ExecutionEvent::RunSuspended { run_id, .. }
            | ExecutionEvent::RunCompleted { run_id, .. }
            | ExecutionEvent::RunFailed { run_id, .. }
            | ExecutionEvent::RunCancelled { run_id, .. }
            | ExecutionEvent::NodeEvent { run_id, .. } => run_id,
        }
    }
}

/// Narration emitted by a node while it runs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum NodeEvent {
    Info { message: String },
    Warning { message: String },
}

/// Event emitter handed to nodes through their context
#[derive(Clone)]
pub struct EventEmitter {
    run_id: RunId,
    node: String,
    sender: broadcast::Sender<ExecutionEvent>,
}

impl EventEmitter {
    pub fn new(run_id: RunId, node: impl Into<String>, sender: broadcast::Sender<ExecutionEvent>) -> Self {
        Self {
            run_id,
            node: node.into(),
            sender,
        }
    }

    pub fn emit(&self, event: NodeEvent) {
        let _ = self.sender.send(ExecutionEvent::NodeEvent {
            run_id: self.run_id.clone(),
            node: self.node.clone(),
            event,
            timestamp: Utc::now(),
        });
    }

    pub fn info(&self, message: impl Into<String>) {
        self.emit(NodeEvent::Info {
            message: message.into(),
        });
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.emit(NodeEvent::Warning {
            message: message.into(),
        });
    }
}

/// Process-wide event bus. Sends never block and are dropped when nobody
/// is subscribed.
pub struct EventBus {
    sender: broadcast::Sender<ExecutionEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ExecutionEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: ExecutionEvent) {
        if self.sender.send(event).is_err() {
            tracing::trace!("execution event dropped: no subscribers");
        }
    }

    pub fn create_emitter(&self, run_id: RunId, node: impl Into<String>) -> EventEmitter {
        EventEmitter::new(run_id, node, self.sender.clone())
    }
}
