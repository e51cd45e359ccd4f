use crate::config_f64;
use crate::tools::KpiTool;
use async_trait::async_trait;
use greencore::{ConfigMap, Node, NodeContext, NodeError, RunState, RISK_INDEX};
use greenruntime::{NodeFactory, NodeMetadata};
use std::sync::Arc;

pub const VERIFIER_TYPE: &str = "greenhouse.verifier";

/// Computes KPIs for the current plan and decides whether a human must
/// approve it (`risk_index > risk_threshold`).
pub struct VerifierNode {
    kpis: Arc<dyn KpiTool>,
    risk_threshold: f64,
}

#[async_trait]
impl Node for VerifierNode {
    fn node_type(&self) -> &str {
        VERIFIER_TYPE
    }

    async fn execute(&self, mut state: RunState, ctx: &NodeContext) -> Result<RunState, NodeError> {
        if state.plan.is_empty() {
            return Err(NodeError::Precondition("no plan to verify".to_string()));
        }

        let kpis = self.kpis.compute_kpis(&state.plan, &state.telemetry)?;
        let risk = *kpis
            .get(RISK_INDEX)
            .ok_or_else(|| NodeError::Tool("KPI tool returned no risk_index".to_string()))?;
        if !risk.is_finite() || risk < 0.0 {
            return Err(NodeError::Tool(format!("KPI tool returned invalid risk_index {risk}")));
        }

        state.kpis = kpis;
        state.hitl_required = risk > self.risk_threshold;
        state.record(
            &ctx.node_name,
            format!(
                "risk_index={risk:.1}, HITL={}",
                if state.hitl_required { "yes" } else { "no" }
            ),
        );
        Ok(state)
    }
}

pub struct VerifierNodeFactory {
    pub kpis: Arc<dyn KpiTool>,
}

impl NodeFactory for VerifierNodeFactory {
    fn create(&self, config: &ConfigMap) -> Result<Box<dyn Node>, NodeError> {
        let risk_threshold = config_f64(config, "risk_threshold", 10.0)?;
        if !risk_threshold.is_finite() || risk_threshold < 0.0 {
            return Err(NodeError::Configuration(format!(
                "risk_threshold must be a non-negative number, got {risk_threshold}"
            )));
        }
        Ok(Box::new(VerifierNode {
            kpis: self.kpis.clone(),
            risk_threshold,
        }))
    }

    fn node_type(&self) -> &str {
        VERIFIER_TYPE
    }

    fn metadata(&self) -> NodeMetadata {
        NodeMetadata {
            description: "Computes KPIs and flags plans that need approval".to_string(),
            category: "verification".to_string(),
        }
    }
}
