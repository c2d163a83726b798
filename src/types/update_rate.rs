//! Update rate control for snapshot sources

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{Result, TelemetryError};

/// Default telemetry update frequency requested from a source
pub const DEFAULT_UPDATE_FREQUENCY_HZ: f64 = 10.0;

/// Update rate for telemetry snapshots
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum UpdateRate {
    /// Full speed from source (typically 60Hz)
    Native,

    /// Throttled to a maximum frequency in Hz
    /// If the requested rate exceeds the source rate, Native is used
    Max(f64),
}

impl Default for UpdateRate {
    fn default() -> Self {
        UpdateRate::Max(DEFAULT_UPDATE_FREQUENCY_HZ)
    }
}

impl UpdateRate {
    /// Build a rate from a requested frequency, rejecting non-positive values
    pub fn from_hz(hz: f64) -> Result<Self> {
        if !hz.is_finite() || hz <= 0.0 {
            return Err(TelemetryError::invalid_config(
                "update_frequency_hz",
                format!("expected a positive frequency, got {}", hz),
            ));
        }
        Ok(UpdateRate::Max(hz))
    }

    /// Normalize rate against source frequency
    pub fn normalize(self, source_hz: f64) -> Self {
        match self {
            UpdateRate::Native => UpdateRate::Native,
            UpdateRate::Max(hz) if hz >= source_hz => UpdateRate::Native,
            UpdateRate::Max(hz) => UpdateRate::Max(hz),
        }
    }

    /// Poll interval for this rate, `None` means as fast as the source
    pub fn interval(self) -> Option<Duration> {
        match self {
            UpdateRate::Native => None,
            UpdateRate::Max(hz) => Some(Duration::from_secs_f64(1.0 / hz)),
        }
    }

    /// Frequency in Hz, or the given source frequency when native
    pub fn hz_or(self, source_hz: f64) -> f64 {
        match self {
            UpdateRate::Native => source_hz,
            UpdateRate::Max(hz) => hz,
        }
    }
}
