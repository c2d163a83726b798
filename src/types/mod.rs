//! Core types for telemetry snapshot representation.
//!
//! - [`TelemetrySnapshot`] is one decoded polling instant of numeric telemetry
//! - [`SessionState`] and [`TrackSurface`] map the simulator's integer enums
//! - [`UpdateRate`] controls how often a source delivers telemetry

mod telemetry;
mod update_rate;

pub use telemetry::{SessionState, TelemetrySnapshot, TrackSurface};
pub use update_rate::{DEFAULT_UPDATE_FREQUENCY_HZ, UpdateRate};
