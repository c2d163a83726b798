//! Snapshot source trait

use std::sync::Arc;

use crate::Result;
use crate::session::SessionDocument;
use crate::types::{TelemetrySnapshot, UpdateRate};

/// One message from the acquisition layer
#[derive(Debug, Clone)]
pub enum SourceUpdate {
    Connected,
    Disconnected,
    Telemetry(TelemetrySnapshot),
    Session(Arc<SessionDocument>),
}

impl SourceUpdate {
    pub fn kind(&self) -> &'static str {
        match self {
            SourceUpdate::Connected => "connected",
            SourceUpdate::Disconnected => "disconnected",
            SourceUpdate::Telemetry(_) => "telemetry",
            SourceUpdate::Session(_) => "session",
        }
    }
}

/// Trait for snapshot sources
///
/// Sources deliver already decoded snapshots and handle their own timing.
/// Telemetry is paced to the rate set through [`set_update_rate`]; session
/// documents and connection changes are delivered as they happen.
///
/// [`set_update_rate`]: SnapshotSource::set_update_rate
#[async_trait::async_trait]
pub trait SnapshotSource: Send + 'static {
    /// Get the next update
    ///
    /// Returns:
    /// - `Ok(Some(update))` - New update available
    /// - `Ok(None)` - Source ended (normal termination)
    /// - `Err(e)` - Error occurred
    async fn next_update(&mut self) -> Result<Option<SourceUpdate>>;

    /// Limit how often telemetry snapshots are delivered
    fn set_update_rate(&mut self, rate: UpdateRate);

    /// Native telemetry rate in Hz
    fn tick_rate(&self) -> f64;
}
