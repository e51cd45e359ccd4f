//! Core abstractions for the greenhouse workflow engine
//!
//! This crate provides the run state threaded through every step, the
//! checkpoint record, the declarative graph definition and the node
//! contract. It executes nothing; see `greenruntime` for the engine.

mod checkpoint;
mod error;
pub mod events;
mod graph;
mod node;
mod state;
mod value;

pub use checkpoint::{Checkpoint, CheckpointStatus, RunFailure, RunId};
pub use error::{EngineError, GraphError, NodeError, StoreError, ValidationError};
pub use events::{EventBus, EventEmitter, ExecutionEvent, NodeEvent};
pub use graph::{Branch, Condition, EdgeSpec, GraphDefinition, NodeSpec};
pub use node::{Node, NodeContext};
pub use state::{
    ClimatePlan, Decision, IrrigationPlan, Kpis, LogEntry, Need, Plan, Policies, Pulse,
    RunState, Setpoint, Telemetry, RISK_INDEX,
};
pub use value::{ConfigMap, Value};

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
