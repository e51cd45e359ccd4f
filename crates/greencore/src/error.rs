use crate::checkpoint::{CheckpointStatus, RunId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Checkpoint store error: {0}")]
    Store(#[from] StoreError),

    #[error("No checkpoint found for run '{0}'")]
    CheckpointNotFound(RunId),

    #[error("Run '{0}' was cancelled")]
    RunCancelled(RunId),

    #[error("Run '{run_id}' is not suspended (status: {status})")]
    NotSuspended {
        run_id: RunId,
        status: CheckpointStatus,
    },

    #[error("Run '{0}' already exists")]
    RunExists(RunId),

    #[error("Run '{run_id}' already finished (status: {status})")]
    RunFinished {
        run_id: RunId,
        status: CheckpointStatus,
    },
}

/// Malformed run state or request, rejected before any node executes
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("telemetry must contain at least one reading")]
    EmptyTelemetry,

    #[error("telemetry reading '{0}' is not a finite number")]
    NonFiniteReading(String),

    #[error("needs is empty after planning")]
    EmptyNeeds,

    #[error("risk_index must be non-negative, got {0}")]
    NegativeRisk(f64),

    #[error("invalid run id '{0}': use 1-128 characters from [A-Za-z0-9_.-]")]
    InvalidRunId(String),

    #[error("unknown decision '{0}': expected 'approved' or 'rejected'")]
    UnknownDecision(String),

    #[error("invalid setting: {0}")]
    InvalidSetting(String),
}

/// Failure raised by a single node; the engine turns it into a failed run
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum NodeError {
    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Tool call failed: {0}")]
    Tool(String),

    #[error("Revision limit exceeded: revision {count} > max {max}")]
    RevisionLimitExceeded { count: u32, max: u32 },

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Duplicate node name: {0}")]
    DuplicateNode(String),

    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    #[error("Invalid edge: {0}")]
    InvalidEdge(String),

    #[error("Graph has no {0} node")]
    MissingDesignation(&'static str),

    #[error("Node '{0}' is unreachable from the start node")]
    Unreachable(String),

    #[error("Failed to create node '{node}': {source}")]
    NodeCreation {
        node: String,
        #[source]
        source: NodeError,
    },
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
