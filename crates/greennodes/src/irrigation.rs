use crate::config_u32;
use async_trait::async_trait;
use greencore::{ConfigMap, IrrigationPlan, Need, Node, NodeContext, NodeError, Pulse, RunState};
use greenruntime::{NodeFactory, NodeMetadata};

pub const IRRIGATION_TYPE: &str = "greenhouse.irrigation";

const PULSE_EC: f64 = 2.2;
const PULSE_VOLUME_L: f64 = 25.0;
const MAINTENANCE_VOLUME_L: f64 = 10.0;

/// Schedules irrigation pulses. Runs on every path: without an irrigation
/// need it still writes a single maintenance pulse, so `plan.irrigation` is
/// always set afterwards.
pub struct IrrigationNode {
    lockout_min: u32,
}

#[async_trait]
impl Node for IrrigationNode {
    fn node_type(&self) -> &str {
        IRRIGATION_TYPE
    }

    async fn execute(&self, mut state: RunState, ctx: &NodeContext) -> Result<RunState, NodeError> {
        let lockout_min = state
            .policies
            .fertigation_lockout_min
            .unwrap_or(self.lockout_min);

        let (pulses, message) = if state.has_need(Need::Irrigation) {
            (
                vec![
                    Pulse {
                        time: "08:15".to_string(),
                        volume_l: PULSE_VOLUME_L,
                        ec: PULSE_EC,
                    },
                    Pulse {
                        time: "09:15".to_string(),
                        volume_l: PULSE_VOLUME_L,
                        ec: PULSE_EC,
                    },
                ],
                "scheduling safe micro-pulses to raise substrate θv to 0.32",
            )
        } else {
            (
                vec![Pulse {
                    time: "08:15".to_string(),
                    volume_l: MAINTENANCE_VOLUME_L,
                    ec: PULSE_EC,
                }],
                "no irrigation need; scheduling maintenance pulse",
            )
        };

        state.plan.irrigation = Some(IrrigationPlan { pulses, lockout_min });
        state.record(&ctx.node_name, message);
        Ok(state)
    }
}

pub struct IrrigationNodeFactory;

impl NodeFactory for IrrigationNodeFactory {
    fn create(&self, config: &ConfigMap) -> Result<Box<dyn Node>, NodeError> {
        Ok(Box::new(IrrigationNode {
            lockout_min: config_u32(config, "fertigation_lockout_min", 20)?,
        }))
    }

    fn node_type(&self) -> &str {
        IRRIGATION_TYPE
    }

    fn metadata(&self) -> NodeMetadata {
        NodeMetadata {
            description: "Writes irrigation pulses into the plan (fallback path)".to_string(),
            category: "planning".to_string(),
        }
    }
}
