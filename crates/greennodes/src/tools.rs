//! External collaborators the nodes call out to, with in-process stand-ins.

use async_trait::async_trait;
use greencore::{Kpis, NodeError, Plan, RunId, Telemetry, RISK_INDEX};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    #[error("{tool} unavailable: {reason}")]
    Unavailable { tool: &'static str, reason: String },

    #[error("{tool} returned an invalid response: {reason}")]
    InvalidResponse { tool: &'static str, reason: String },

    #[error("actuator rejected the plan: {0}")]
    Rejected(String),
}

impl From<ToolError> for NodeError {
    fn from(e: ToolError) -> Self {
        NodeError::Tool(e.to_string())
    }
}

/// Supplies live sensor readings
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    /// At least one reading; an empty map is an error
    async fn read(&self) -> Result<Telemetry, ToolError>;
}

/// Fixed readings, as used by the demos and tests
#[derive(Debug, Clone)]
pub struct StaticTelemetry(pub Telemetry);

impl StaticTelemetry {
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, f64)>) -> Self {
        Self(pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }
}

#[async_trait]
impl TelemetrySource for StaticTelemetry {
    async fn read(&self) -> Result<Telemetry, ToolError> {
        if self.0.is_empty() {
            return Err(ToolError::InvalidResponse {
                tool: "telemetry",
                reason: "no readings".to_string(),
            });
        }
        Ok(self.0.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub cloud_cover: f64,
    pub temp_out: f64,
}

#[async_trait]
pub trait ForecastTool: Send + Sync {
    async fn forecast(&self) -> Result<Forecast, ToolError>;
}

#[derive(Debug, Clone, Copy)]
pub struct StaticForecast(pub Forecast);

impl Default for StaticForecast {
    fn default() -> Self {
        Self(Forecast {
            cloud_cover: 0.7,
            temp_out: 26.0,
        })
    }
}

#[async_trait]
impl ForecastTool for StaticForecast {
    async fn forecast(&self) -> Result<Forecast, ToolError> {
        Ok(self.0)
    }
}

/// Pure KPI computation; the result must carry `risk_index`
pub trait KpiTool: Send + Sync {
    fn compute_kpis(&self, plan: &Plan, telemetry: &Telemetry) -> Result<Kpis, ToolError>;
}

/// Toy risk model on a 0-60 scale: 20 points each for low VPD, dry
/// substrate and a short light day. Missing sensors fall back to neutral
/// readings.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardKpis;

impl KpiTool for StandardKpis {
    fn compute_kpis(&self, plan: &Plan, telemetry: &Telemetry) -> Result<Kpis, ToolError> {
        let vpd = telemetry.get("vpd_now").copied().unwrap_or(1.0);
        let soil = telemetry.get("soil_theta").copied().unwrap_or(0.32);
        let dli = telemetry.get("dli_today").copied().unwrap_or(18.0);

        let flags = [vpd < 0.5, soil < 0.28, dli < 18.0];
        let risk = flags.iter().filter(|f| **f).count() as f64 * 20.0;

        let mut kpis = Kpis::new();
        kpis.insert(RISK_INDEX.to_string(), risk);
        if let Some(irrigation) = &plan.irrigation {
            kpis.insert("irrigation_volume_l".to_string(), irrigation.total_volume_l());
            kpis.insert("pulse_count".to_string(), irrigation.pulses.len() as f64);
        }
        if let Some(climate) = &plan.climate {
            kpis.insert("co2_peak_ppm".to_string(), climate.co2_peak_ppm());
        }
        Ok(kpis)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyOutcome {
    Applied,
    /// Identical plan already applied for this run; nothing sent
    AlreadyApplied,
}

/// Where committed plans go
#[async_trait]
pub trait ActuatorSink: Send + Sync {
    /// Must be idempotent for a repeated identical plan on the same run
    async fn apply(&self, run_id: &RunId, plan: &Plan) -> Result<ApplyOutcome, ToolError>;
}

/// Records applied plans in memory, standing in for a SCADA proxy
#[derive(Debug, Clone, Default)]
pub struct RecordingActuator {
    applied: Arc<Mutex<Vec<(RunId, Plan)>>>,
}

impl RecordingActuator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plans that actually reached the actuator, in order
    pub async fn applied(&self) -> Vec<(RunId, Plan)> {
        self.applied.lock().await.clone()
    }

    pub async fn apply_count(&self) -> usize {
        self.applied.lock().await.len()
    }
}

#[async_trait]
impl ActuatorSink for RecordingActuator {
    async fn apply(&self, run_id: &RunId, plan: &Plan) -> Result<ApplyOutcome, ToolError> {
        let mut applied = self.applied.lock().await;
        if applied.iter().any(|(id, p)| id == run_id && p == plan) {
            tracing::debug!(run_id = %run_id, "plan already applied, skipping");
            return Ok(ApplyOutcome::AlreadyApplied);
        }
        applied.push((run_id.clone(), plan.clone()));
        tracing::info!(run_id = %run_id, "plan applied to actuator");
        Ok(ApplyOutcome::Applied)
    }
}

/// The collaborators handed to node factories
#[derive(Clone)]
pub struct Toolbox {
    pub forecast: Arc<dyn ForecastTool>,
    pub kpis: Arc<dyn KpiTool>,
    pub actuator: Arc<dyn ActuatorSink>,
}

impl Toolbox {
    pub fn with_actuator(mut self, actuator: Arc<dyn ActuatorSink>) -> Self {
        self.actuator = actuator;
        self
    }

    pub fn with_forecast(mut self, forecast: Arc<dyn ForecastTool>) -> Self {
        self.forecast = forecast;
        self
    }

    pub fn with_kpis(mut self, kpis: Arc<dyn KpiTool>) -> Self {
        self.kpis = kpis;
        self
    }
}

impl Default for Toolbox {
    fn default() -> Self {
        Self {
            forecast: Arc::new(StaticForecast::default()),
            kpis: Arc::new(StandardKpis),
            actuator: Arc::new(RecordingActuator::new()),
        }
    }
}
