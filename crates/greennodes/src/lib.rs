//! Greenhouse node library
//!
//! The eight steps of the climate/irrigation planning graph, the tools
//! they call, and the graph definition wiring them together.

mod approval;
mod climate;
mod commit;
pub mod greenhouse;
mod irrigation;
mod planner;
mod revise;
mod settings;
pub mod tools;
mod verifier;

pub use approval::{DecideNode, HitlNode};
pub use climate::ClimateNode;
pub use commit::CommitNode;
pub use greenhouse::{compile_greenhouse, greenhouse_graph, scenarios};
pub use irrigation::IrrigationNode;
pub use planner::PlannerNode;
pub use revise::ReviseNode;
pub use settings::GreenhouseSettings;
pub use tools::{
    ActuatorSink, ApplyOutcome, Forecast, ForecastTool, KpiTool, RecordingActuator, StandardKpis,
    StaticForecast, StaticTelemetry, TelemetrySource, ToolError, Toolbox,
};
pub use verifier::VerifierNode;

use greencore::{ConfigMap, NodeError};
use greenruntime::NodeRegistry;
use std::sync::Arc;

/// Register all greenhouse nodes with a registry
pub fn register_all(registry: &mut NodeRegistry, tools: &Toolbox) {
    registry.register(Arc::new(planner::PlannerNodeFactory));
    registry.register(Arc::new(climate::ClimateNodeFactory {
        forecast: tools.forecast.clone(),
    }));
    registry.register(Arc::new(irrigation::IrrigationNodeFactory));
    registry.register(Arc::new(verifier::VerifierNodeFactory {
        kpis: tools.kpis.clone(),
    }));
    registry.register(Arc::new(approval::HitlNodeFactory));
    registry.register(Arc::new(approval::DecideNodeFactory));
    registry.register(Arc::new(revise::ReviseNodeFactory));
    registry.register(Arc::new(commit::CommitNodeFactory {
        actuator: tools.actuator.clone(),
    }));
}

pub(crate) fn config_f64(config: &ConfigMap, key: &str, default: f64) -> Result<f64, NodeError> {
    match config.get(key) {
        None => Ok(default),
        Some(value) => value
            .as_f64()
            .filter(|v| v.is_finite())
            .ok_or_else(|| NodeError::Configuration(format!("'{key}' must be a number, got {value}"))),
    }
}

pub(crate) fn config_u32(config: &ConfigMap, key: &str, default: u32) -> Result<u32, NodeError> {
    match config.get(key) {
        None => Ok(default),
        Some(value) => value.as_u32().ok_or_else(|| {
            NodeError::Configuration(format!("'{key}' must be a non-negative integer, got {value}"))
        }),
    }
}
