use crate::tools::{ActuatorSink, ApplyOutcome};
use async_trait::async_trait;
use greencore::{ConfigMap, Decision, Node, NodeContext, NodeError, RunState};
use greenruntime::{NodeFactory, NodeMetadata};
use std::sync::Arc;

pub const COMMIT_TYPE: &str = "greenhouse.commit";

/// Terminal step: hands the plan to the actuator sink
pub struct CommitNode {
    actuator: Arc<dyn ActuatorSink>,
}

#[async_trait]
impl Node for CommitNode {
    fn node_type(&self) -> &str {
        COMMIT_TYPE
    }

    async fn execute(&self, mut state: RunState, ctx: &NodeContext) -> Result<RunState, NodeError> {
        if state.hitl_required && state.last_decision != Some(Decision::Approved) {
            return Err(NodeError::Precondition(
                "plan requires approval before commit".to_string(),
            ));
        }

        let message = match self.actuator.apply(&ctx.run_id, &state.plan).await? {
            ApplyOutcome::Applied => "applying plan to SCADA proxy",
            ApplyOutcome::AlreadyApplied => "plan already applied, nothing sent",
        };
        state.record(&ctx.node_name, message);
        Ok(state)
    }
}

pub struct CommitNodeFactory {
    pub actuator: Arc<dyn ActuatorSink>,
}

impl NodeFactory for CommitNodeFactory {
    fn create(&self, _config: &ConfigMap) -> Result<Box<dyn Node>, NodeError> {
        Ok(Box::new(CommitNode {
            actuator: self.actuator.clone(),
        }))
    }

    fn node_type(&self) -> &str {
        COMMIT_TYPE
    }

    fn metadata(&self) -> NodeMetadata {
        NodeMetadata {
            description: "Applies the approved plan to the actuator sink".to_string(),
            category: "actuation".to_string(),
        }
    }
}
