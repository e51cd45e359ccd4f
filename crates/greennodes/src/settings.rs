use greencore::ValidationError;
use serde::{Deserialize, Serialize};

/// Tunables for the greenhouse graph. Loaded from JSON by the binaries and
/// baked into node configs when the graph definition is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GreenhouseSettings {
    /// Substrate water content below which irrigation is needed
    pub soil_theta_min: f64,
    pub vpd_low: f64,
    pub vpd_high: f64,
    /// Plans with a risk index strictly above this need human approval
    pub risk_threshold: f64,
    pub max_revisions: u32,
    /// Multiplier applied to plan magnitudes on each revision
    pub shrink_factor: f64,
    pub min_pulse_volume_l: f64,
    pub co2_floor_ppm: f64,
    pub fertigation_lockout_min: u32,
}

impl Default for GreenhouseSettings {
    fn default() -> Self {
        Self {
            soil_theta_min: 0.30,
            vpd_low: 0.8,
            vpd_high: 1.2,
            risk_threshold: 10.0,
            max_revisions: 3,
            shrink_factor: 0.8,
            min_pulse_volume_l: 5.0,
            co2_floor_ppm: 400.0,
            fertigation_lockout_min: 20,
        }
    }
}

impl GreenhouseSettings {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let invalid = |msg: String| Err(ValidationError::InvalidSetting(msg));
        if !(self.shrink_factor > 0.0 && self.shrink_factor <= 1.0) {
            return invalid(format!("shrink_factor must be in (0, 1], got {}", self.shrink_factor));
        }
        if !(self.risk_threshold.is_finite() && self.risk_threshold >= 0.0) {
            return invalid(format!("risk_threshold must be >= 0, got {}", self.risk_threshold));
        }
        if self.vpd_low >= self.vpd_high {
            return invalid(format!(
                "vpd_low ({}) must be below vpd_high ({})",
                self.vpd_low, self.vpd_high
            ));
        }
        if self.min_pulse_volume_l < 0.0 || self.co2_floor_ppm < 0.0 {
            return invalid("floors must be non-negative".to_string());
        }
        Ok(())
    }
}
