use async_trait::async_trait;
use greencore::{ConfigMap, Decision, Node, NodeContext, NodeError, RunState};
use greenruntime::{NodeFactory, NodeMetadata};

pub const HITL_TYPE: &str = "greenhouse.hitl";
pub const DECIDE_TYPE: &str = "greenhouse.decide";

/// Human approval gate.
///
/// The engine suspends before this node when no decision is present, so it
/// normally only sees resumed states. Without a decision it leaves the
/// state untouched; with one it records the verdict and passes it on.
pub struct HitlNode;

#[async_trait]
impl Node for HitlNode {
    fn node_type(&self) -> &str {
        HITL_TYPE
    }

    async fn execute(&self, mut state: RunState, ctx: &NodeContext) -> Result<RunState, NodeError> {
        let Some(decision) = state.decision else {
            return Ok(state);
        };
        state.record(&ctx.node_name, format!("reviewer decision={decision}"));
        Ok(state)
    }
}

pub struct HitlNodeFactory;

impl NodeFactory for HitlNodeFactory {
    fn create(&self, _config: &ConfigMap) -> Result<Box<dyn Node>, NodeError> {
        Ok(Box::new(HitlNode))
    }

    fn node_type(&self) -> &str {
        HITL_TYPE
    }

    fn metadata(&self) -> NodeMetadata {
        NodeMetadata {
            description: "Approval gate; the run suspends here until a decision arrives".to_string(),
            category: "approval".to_string(),
        }
    }
}

/// Junction after the gate. Consumes the decision so that the next pass
/// through the gate suspends again; routing reads `last_decision`.
pub struct DecideNode;

#[async_trait]
impl Node for DecideNode {
    fn node_type(&self) -> &str {
        DECIDE_TYPE
    }

    async fn execute(&self, mut state: RunState, ctx: &NodeContext) -> Result<RunState, NodeError> {
        let decision = state
            .take_decision()
            .ok_or_else(|| NodeError::Precondition("reached without a decision".to_string()))?;
        state.last_decision = Some(decision);

        let outcome = match decision {
            Decision::Approved => "approved, committing",
            Decision::Rejected => "rejected, revising",
        };
        state.record(&ctx.node_name, outcome);
        Ok(state)
    }
}

pub struct DecideNodeFactory;

impl NodeFactory for DecideNodeFactory {
    fn create(&self, _config: &ConfigMap) -> Result<Box<dyn Node>, NodeError> {
        Ok(Box::new(DecideNode))
    }

    fn node_type(&self) -> &str {
        DECIDE_TYPE
    }

    fn metadata(&self) -> NodeMetadata {
        NodeMetadata {
            description: "Consumes the reviewer decision".to_string(),
            category: "approval".to_string(),
        }
    }
}
