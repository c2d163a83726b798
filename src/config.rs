//! Engine configuration

use serde::{Deserialize, Serialize};

use crate::{Result, TelemetryError};

/// Tunables for [`RaceEngine`](crate::RaceEngine)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of car slots scanned in the roster
    pub max_cars: usize,
    /// Minimum session time between two gap history samples of one car (seconds)
    pub gap_sample_interval: f64,
    /// Gap history samples kept per car
    pub gap_history_capacity: usize,
    /// Track length used when the session document has no usable length
    pub default_track_length_km: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_cars: 70,
            gap_sample_interval: 0.1,
            gap_history_capacity: 2048,
            default_track_length_km: 1.0,
        }
    }
}

impl EngineConfig {
    /// Load from YAML, missing keys take their defaults
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_cars == 0 {
            return Err(TelemetryError::invalid_config("max_cars", "must be at least 1"));
        }
        if !self.gap_sample_interval.is_finite() || self.gap_sample_interval < 0.0 {
            return Err(TelemetryError::invalid_config(
                "gap_sample_interval",
                format!("expected a non-negative number of seconds, got {}", self.gap_sample_interval),
            ));
        }
        if self.gap_history_capacity < 2 {
            return Err(TelemetryError::invalid_config(
                "gap_history_capacity",
                "interpolation needs at least two samples",
            ));
        }
        if !self.default_track_length_km.is_finite() || self.default_track_length_km <= 0.0 {
            return Err(TelemetryError::invalid_config(
                "default_track_length_km",
                "must be positive",
            ));
        }
        Ok(())
    }
}
