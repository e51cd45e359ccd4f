use crate::config_f64;
use async_trait::async_trait;
use greencore::{ConfigMap, Need, Node, NodeContext, NodeError, RunState};
use greenruntime::{NodeFactory, NodeMetadata};

pub const PLANNER_TYPE: &str = "greenhouse.planner";

/// Decides which subsystems need attention from telemetry thresholds.
///
/// Never leaves `needs` empty: a quiet greenhouse yields `[none]`. Missing
/// sensors are treated as in range and reported as warnings.
pub struct PlannerNode {
    soil_theta_min: f64,
    vpd_low: f64,
    vpd_high: f64,
}

impl PlannerNode {
    fn plan_needs(&self, state: &RunState, ctx: &NodeContext) -> Vec<Need> {
        let mut needs = Vec::new();

        match state.reading("soil_theta") {
            Some(soil) if soil < self.soil_theta_min => needs.push(Need::Irrigation),
            Some(_) => {}
            None => ctx.events.warn("soil_theta missing; assuming substrate is wet enough"),
        }
        match state.reading("vpd_now") {
            Some(vpd) if vpd < self.vpd_low || vpd > self.vpd_high => needs.push(Need::Climate),
            Some(_) => {}
            None => ctx.events.warn("vpd_now missing; assuming VPD is in band"),
        }

        if needs.is_empty() {
            needs.push(Need::None);
        }
        needs
    }
}

#[async_trait]
impl Node for PlannerNode {
    fn node_type(&self) -> &str {
        PLANNER_TYPE
    }

    async fn execute(&self, mut state: RunState, ctx: &NodeContext) -> Result<RunState, NodeError> {
        if state.telemetry.is_empty() {
            return Err(NodeError::Precondition("telemetry is empty".to_string()));
        }
        ctx.events.info("evaluating telemetry & deciding routes");

        state.needs = self.plan_needs(&state, ctx);
        let listed: Vec<&str> = state.needs.iter().map(Need::as_str).collect();
        state.record(&ctx.node_name, format!("needs=[{}]", listed.join(", ")));
        Ok(state)
    }
}

pub struct PlannerNodeFactory;

impl NodeFactory for PlannerNodeFactory {
    fn create(&self, config: &ConfigMap) -> Result<Box<dyn Node>, NodeError> {
        let node = PlannerNode {
            soil_theta_min: config_f64(config, "soil_theta_min", 0.30)?,
            vpd_low: config_f64(config, "vpd_low", 0.8)?,
            vpd_high: config_f64(config, "vpd_high", 1.2)?,
        };
        if node.vpd_low >= node.vpd_high {
            return Err(NodeError::Configuration("vpd_low must be below vpd_high".to_string()));
        }
        Ok(Box::new(node))
    }

    fn node_type(&self) -> &str {
        PLANNER_TYPE
    }

    fn metadata(&self) -> NodeMetadata {
        NodeMetadata {
            description: "Derives irrigation/climate needs from telemetry thresholds".to_string(),
            category: "planning".to_string(),
        }
    }
}
