//! Telemetry snapshot types
//!
//! A [`TelemetrySnapshot`] is one polling instant of the simulator's numeric
//! telemetry, already decoded by the acquisition layer. Per-car values are
//! indexed by car slot (`CarIdx`).

use serde::{Deserialize, Serialize};

/// Session state as reported by the simulator (`irsdk_SessionState`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SessionState {
    #[default]
    Invalid,
    GetInCar,
    Warmup,
    ParadeLaps,
    Racing,
    Checkered,
    CoolDown,
}

impl SessionState {
    /// Map the provider's integer code, unknown codes become `Invalid`
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            1 => SessionState::GetInCar,
            2 => SessionState::Warmup,
            3 => SessionState::ParadeLaps,
            4 => SessionState::Racing,
            5 => SessionState::Checkered,
            6 => SessionState::CoolDown,
            _ => SessionState::Invalid,
        }
    }

    /// Whether cars are on track under green or checkered flag
    pub fn is_running(self) -> bool {
        matches!(self, SessionState::Racing | SessionState::Checkered)
    }
}

impl From<i32> for SessionState {
    fn from(raw: i32) -> Self {
        Self::from_raw(raw)
    }
}

/// Where a car is relative to the racing surface (`irsdk_TrkLoc`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TrackSurface {
    #[default]
    NotInWorld,
    OffTrack,
    InPitStall,
    ApproachingPits,
    OnTrack,
}

impl TrackSurface {
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            0 => TrackSurface::OffTrack,
            1 => TrackSurface::InPitStall,
            2 => TrackSurface::ApproachingPits,
            3 => TrackSurface::OnTrack,
            _ => TrackSurface::NotInWorld,
        }
    }
}

impl From<i32> for TrackSurface {
    fn from(raw: i32) -> Self {
        Self::from_raw(raw)
    }
}

/// Instantaneous telemetry values for one polling instant
///
/// `car_idx_lap_dist_pct` is always populated by the source. The lap counter,
/// pit road and track surface arrays are optional: an empty vector means the
/// source does not provide them, and consumers fall back accordingly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    /// Seconds since session start
    pub session_time: f64,
    /// Current session number within the event
    pub session_number: i32,
    /// Current session state
    pub session_state: SessionState,
    /// Normalized lap distance per car slot, 0.0..1.0, negative when not in world
    pub car_idx_lap_dist_pct: Vec<f32>,
    /// Lap counter per car slot
    #[serde(default)]
    pub car_idx_lap: Vec<i32>,
    /// Whether each car is between the pit lane cones
    #[serde(default)]
    pub car_idx_on_pit_road: Vec<bool>,
    /// Surface location per car slot
    #[serde(default)]
    pub car_idx_track_surface: Vec<TrackSurface>,
}

impl TelemetrySnapshot {
    /// Create a snapshot with lap distances only
    pub fn new(
        session_time: f64,
        session_number: i32,
        session_state: SessionState,
        car_idx_lap_dist_pct: Vec<f32>,
    ) -> Self {
        Self {
            session_time,
            session_number,
            session_state,
            car_idx_lap_dist_pct,
            ..Default::default()
        }
    }

    /// Attach per-slot lap counters
    pub fn with_laps(mut self, laps: Vec<i32>) -> Self {
        self.car_idx_lap = laps;
        self
    }

    /// Attach per-slot pit road and surface arrays
    pub fn with_pit_state(mut self, on_pit_road: Vec<bool>, surface: Vec<TrackSurface>) -> Self {
        self.car_idx_on_pit_road = on_pit_road;
        self.car_idx_track_surface = surface;
        self
    }

    /// Lap distance fraction for a slot, `None` when the car is not in world
    pub fn lap_dist_pct(&self, slot: usize) -> Option<f32> {
        self.car_idx_lap_dist_pct.get(slot).copied().filter(|pct| *pct >= 0.0 && pct.is_finite())
    }

    /// Lap counter for a slot, `None` when unavailable
    pub fn lap(&self, slot: usize) -> Option<i32> {
        self.car_idx_lap.get(slot).copied().filter(|lap| *lap >= 0)
    }

    pub fn on_pit_road(&self, slot: usize) -> Option<bool> {
        self.car_idx_on_pit_road.get(slot).copied()
    }

    pub fn track_surface(&self, slot: usize) -> Option<TrackSurface> {
        self.car_idx_track_surface.get(slot).copied()
    }
}
