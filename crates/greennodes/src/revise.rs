use crate::{config_f64, config_u32};
use async_trait::async_trait;
use greencore::{ConfigMap, Decision, Node, NodeContext, NodeError, Plan, RunState};
use greenruntime::{NodeFactory, NodeMetadata};

pub const REVISE_TYPE: &str = "greenhouse.revise";

/// Relative humidity a revised climate plan is raised to, at least
const REVISED_RH_PCT: f64 = 70.0;

/// Shrinks a rejected plan and counts the revision.
///
/// Irrigation keeps only its first pulse, scaled by `shrink_factor` but
/// never below `min_pulse_volume_l`. Climate setpoints get at least 70 % RH
/// and their CO2 enrichment above `co2_floor_ppm` scaled the same way.
pub struct ReviseNode {
    max_revisions: u32,
    shrink_factor: f64,
    min_pulse_volume_l: f64,
    co2_floor_ppm: f64,
}

impl ReviseNode {
    fn shrink(&self, plan: &mut Plan) {
        if let Some(irrigation) = plan.irrigation.as_mut() {
            irrigation.pulses.truncate(1);
            for pulse in &mut irrigation.pulses {
                let shrunk = pulse.volume_l * self.shrink_factor;
                // A pulse already under the floor is left as is, never raised.
                pulse.volume_l = shrunk.max(self.min_pulse_volume_l.min(pulse.volume_l));
            }
        }
        if let Some(climate) = plan.climate.as_mut() {
            for setpoint in &mut climate.setpoints {
                setpoint.rh_pct = setpoint.rh_pct.max(REVISED_RH_PCT);
                if setpoint.co2_ppm > self.co2_floor_ppm {
                    let enrichment = setpoint.co2_ppm - self.co2_floor_ppm;
                    setpoint.co2_ppm = self.co2_floor_ppm + enrichment * self.shrink_factor;
                }
            }
        }
    }
}

#[async_trait]
impl Node for ReviseNode {
    fn node_type(&self) -> &str {
        REVISE_TYPE
    }

    async fn execute(&self, mut state: RunState, ctx: &NodeContext) -> Result<RunState, NodeError> {
        if state.last_decision != Some(Decision::Rejected) {
            return Err(NodeError::Precondition(
                "revise is only entered after a rejection".to_string(),
            ));
        }

        let count = state.revision_count + 1;
        if count > self.max_revisions {
            return Err(NodeError::RevisionLimitExceeded {
                count,
                max: self.max_revisions,
            });
        }

        self.shrink(&mut state.plan);
        state.revision_count = count;
        state.last_decision = None;
        state.record(
            &ctx.node_name,
            format!("reviewer requested changes, shrinking adjustments (revision {count})"),
        );
        Ok(state)
    }
}

pub struct ReviseNodeFactory;

impl NodeFactory for ReviseNodeFactory {
    fn create(&self, config: &ConfigMap) -> Result<Box<dyn Node>, NodeError> {
        let node = ReviseNode {
            max_revisions: config_u32(config, "max_revisions", 3)?,
            shrink_factor: config_f64(config, "shrink_factor", 0.8)?,
            min_pulse_volume_l: config_f64(config, "min_pulse_volume_l", 5.0)?,
            co2_floor_ppm: config_f64(config, "co2_floor_ppm", 400.0)?,
        };
        if !(node.shrink_factor > 0.0 && node.shrink_factor <= 1.0) {
            return Err(NodeError::Configuration(format!(
                "shrink_factor must be in (0, 1], got {}",
                node.shrink_factor
            )));
        }
        Ok(Box::new(node))
    }

    fn node_type(&self) -> &str {
        REVISE_TYPE
    }

    fn metadata(&self) -> NodeMetadata {
        NodeMetadata {
            description: "Shrinks a rejected plan, bounded by max_revisions".to_string(),
            category: "approval".to_string(),
        }
    }
}
