use crate::error::{NodeError, ValidationError};
use crate::state::RunState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Caller-owned identifier of one run.
///
/// Restricted to filesystem-safe characters so that file-backed stores can
/// use it directly as a file stem.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RunId(String);

impl RunId {
    pub fn parse(raw: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = raw.into();
        let valid = !raw.is_empty()
            && raw.len() <= 128
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
            && !raw.starts_with('.');
        if valid {
            Ok(Self(raw))
        } else {
            Err(ValidationError::InvalidRunId(raw))
        }
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RunId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RunId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<RunId> for String {
    fn from(id: RunId) -> Self {
        id.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointStatus {
    /// Between steps; the pending node has not executed yet
    Running,
    /// Suspended before the interrupt node, waiting for a decision
    Interrupted,
    Completed,
    Failed,
    Cancelled,
}

impl CheckpointStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CheckpointStatus::Completed | CheckpointStatus::Failed | CheckpointStatus::Cancelled
        )
    }
}

impl fmt::Display for CheckpointStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CheckpointStatus::Running => "running",
            CheckpointStatus::Interrupted => "interrupted",
            CheckpointStatus::Completed => "completed",
            CheckpointStatus::Failed => "failed",
            CheckpointStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Why a run ended in the failed state
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("run '{run_id}' failed at node '{node}' (revision_count={revision_count}): {error}")]
pub struct RunFailure {
    pub run_id: RunId,
    pub node: String,
    pub revision_count: u32,
    pub error: NodeError,
}

/// Latest durable snapshot of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub run_id: RunId,
    pub state: RunState,
    /// Next node to execute; `None` once the terminal node has run
    pub pending_node: Option<String>,
    pub status: CheckpointStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<RunFailure>,
    /// Number of node executions folded into this snapshot
    pub step: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Checkpoint {
    pub fn new(run_id: RunId, state: RunState, start: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            run_id,
            state,
            pending_node: Some(start.into()),
            status: CheckpointStatus::Running,
            failure: None,
            step: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_interrupted(&self) -> bool {
        self.status == CheckpointStatus::Interrupted
    }

    /// Fold one executed node into the snapshot
    pub fn advance(&mut self, state: RunState, pending_node: Option<String>, status: CheckpointStatus) {
        self.state = state;
        self.pending_node = pending_node;
        self.status = status;
        self.step += 1;
        self.updated_at = Utc::now();
    }

    /// Change the status only, leaving the snapshot untouched
    pub fn mark(&mut self, status: CheckpointStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    pub fn mark_failed(&mut self, failure: RunFailure) {
        self.failure = Some(failure);
        self.mark(CheckpointStatus::Failed);
    }
}
