use crate::{events::EventEmitter, NodeError, RunId, RunState};
use async_trait::async_trait;

/// Core trait that every step of the graph implements.
///
/// A node receives the run state by value and returns the next state. It
/// never sees anything it was not handed, and appends exactly one entry to
/// the state's log on every execution that changes the state.
#[async_trait]
pub trait Node: Send + Sync {
    /// Type identifier used by the registry (e.g. "greenhouse.planner")
    fn node_type(&self) -> &str;

    /// Transform the state
    async fn execute(&self, state: RunState, ctx: &NodeContext) -> Result<RunState, NodeError>;
}

/// Execution context passed to each node
#[derive(Clone)]
pub struct NodeContext {
    pub run_id: RunId,

    /// Name of the node within the graph (e.g. "Verifier")
    pub node_name: String,

    /// Event emitter for narration
    pub events: EventEmitter,
}

impl NodeContext {
    pub fn new(run_id: RunId, node_name: impl Into<String>, events: EventEmitter) -> Self {
        Self {
            run_id,
            node_name: node_name.into(),
            events,
        }
    }
}
