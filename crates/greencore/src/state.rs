use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Sensor name to reading, e.g. `vpd_now`, `soil_theta`, `dli_today`
pub type Telemetry = BTreeMap<String, f64>;

/// Metric name to value; always carries [`RISK_INDEX`] once verified
pub type Kpis = BTreeMap<String, f64>;

pub const RISK_INDEX: &str = "risk_index";

/// A subsystem the planner decided needs attention this cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Need {
    Irrigation,
    Climate,
    None,
}

impl Need {
    pub fn as_str(&self) -> &'static str {
        match self {
            Need::Irrigation => "irrigation",
            Need::Climate => "climate",
            Need::None => "none",
        }
    }
}

impl fmt::Display for Need {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reviewer verdict supplied from outside the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approved,
    Rejected,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Approved => "approved",
            Decision::Rejected => "rejected",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Decision {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "approved" | "approve" => Ok(Decision::Approved),
            "rejected" | "reject" => Ok(Decision::Rejected),
            other => Err(ValidationError::UnknownDecision(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Setpoint {
    pub hour: u8,
    pub temp_c: f64,
    pub rh_pct: f64,
    pub co2_ppm: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimatePlan {
    pub setpoints: Vec<Setpoint>,
    pub notes: String,
}

impl ClimatePlan {
    pub fn co2_peak_ppm(&self) -> f64 {
        self.setpoints.iter().map(|s| s.co2_ppm).fold(0.0, f64::max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pulse {
    /// Local wall-clock time, `HH:MM`
    pub time: String,
    pub volume_l: f64,
    pub ec: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrrigationPlan {
    pub pulses: Vec<Pulse>,
    pub lockout_min: u32,
}

impl IrrigationPlan {
    pub fn total_volume_l(&self) -> f64 {
        self.pulses.iter().map(|p| p.volume_l).sum()
    }
}

/// Proposed setpoints per subsystem
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub climate: Option<ClimatePlan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub irrigation: Option<IrrigationPlan>,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.climate.is_none() && self.irrigation.is_none()
    }
}

/// Site guardrails supplied with the run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Policies {
    #[serde(default)]
    pub fertigation_lockout_min: Option<u32>,
    #[serde(default)]
    pub protected_limits: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub node: String,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.node, self.message)
    }
}

/// The single record threaded through every node of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    pub telemetry: Telemetry,
    #[serde(default)]
    pub policies: Policies,
    #[serde(default)]
    pub needs: Vec<Need>,
    #[serde(default)]
    pub plan: Plan,
    #[serde(default)]
    pub kpis: Kpis,
    #[serde(default)]
    pub hitl_required: bool,
    /// Pending reviewer input, present only between a resume call and Decide
    #[serde(default)]
    pub decision: Option<Decision>,
    /// The decision Decide consumed most recently
    #[serde(default)]
    pub last_decision: Option<Decision>,
    #[serde(default)]
    pub revision_count: u32,
    #[serde(default)]
    pub log: Vec<LogEntry>,
}

impl RunState {
    pub fn new(telemetry: Telemetry) -> Self {
        Self {
            telemetry,
            policies: Policies::default(),
            needs: Vec::new(),
            plan: Plan::default(),
            kpis: Kpis::new(),
            hitl_required: false,
            decision: None,
            last_decision: None,
            revision_count: 0,
            log: Vec::new(),
        }
    }

    pub fn with_policies(mut self, policies: Policies) -> Self {
        self.policies = policies;
        self
    }

    pub fn with_decision(mut self, decision: Decision) -> Self {
        self.decision = Some(decision);
        self
    }

    pub fn has_need(&self, need: Need) -> bool {
        self.needs.contains(&need)
    }

    pub fn reading(&self, sensor: &str) -> Option<f64> {
        self.telemetry.get(sensor).copied()
    }

    pub fn risk_index(&self) -> Option<f64> {
        self.kpis.get(RISK_INDEX).copied()
    }

    /// Append one audit record
    pub fn record(&mut self, node: &str, message: impl Into<String>) {
        self.log.push(LogEntry {
            node: node.to_string(),
            message: message.into(),
            at: Utc::now(),
        });
    }

    /// Consume the pending decision
    pub fn take_decision(&mut self) -> Option<Decision> {
        self.decision.take()
    }

    /// Check the invariants a state must satisfy before a node may run on it.
    ///
    /// `planned` is true once the start node has executed, after which
    /// `needs` may no longer be empty.
    pub fn validate(&self, planned: bool) -> Result<(), ValidationError> {
        if self.telemetry.is_empty() {
            return Err(ValidationError::EmptyTelemetry);
        }
        if let Some((name, _)) = self.telemetry.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ValidationError::NonFiniteReading(name.clone()));
        }
        if planned && self.needs.is_empty() {
            return Err(ValidationError::EmptyNeeds);
        }
        match self.risk_index() {
            Some(risk) if risk < 0.0 || risk.is_nan() => Err(ValidationError::NegativeRisk(risk)),
            _ => Ok(()),
        }
    }
}
