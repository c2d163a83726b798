//! Domain events and their delivery
//!
//! Every event is stamped with the session time at which it was detected and
//! delivered, in emission order, to each subscriber of the [`EventBus`].
//! Payloads are owned copies, so subscribers never touch engine state.

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::trace;

use crate::model::{BestLap, Driver, PitstopPhase};
use crate::registry::DriverSwap;
use crate::session::SessionDocument;
use crate::types::TelemetrySnapshot;

#[derive(Debug, Clone)]
pub struct RaceEvent {
    /// Session time of detection, last known value for connection events
    pub session_time: f64,
    pub kind: RaceEventKind,
}

#[derive(Debug, Clone)]
pub enum RaceEventKind {
    Connected,
    Disconnected,
    /// Track or event type changed, re-read the session data
    StaticInfoChanged,
    SessionInfoUpdated(Arc<SessionDocument>),
    TelemetryUpdated(Arc<TelemetrySnapshot>),
    DriverSwap(Box<DriverSwap>),
    Pitstop { phase: PitstopPhase, driver: Box<Driver> },
    FastestLap { driver: Box<Driver>, lap: BestLap },
    LeaderChange { driver: Box<Driver> },
}

impl RaceEvent {
    pub fn new(session_time: f64, kind: RaceEventKind) -> Self {
        Self { session_time, kind }
    }

    /// Short label for logging
    pub fn name(&self) -> &'static str {
        match self.kind {
            RaceEventKind::Connected => "connected",
            RaceEventKind::Disconnected => "disconnected",
            RaceEventKind::StaticInfoChanged => "static-info-changed",
            RaceEventKind::SessionInfoUpdated(_) => "session-info-updated",
            RaceEventKind::TelemetryUpdated(_) => "telemetry-updated",
            RaceEventKind::DriverSwap(_) => "driver-swap",
            RaceEventKind::Pitstop { .. } => "pit-stop-phase",
            RaceEventKind::FastestLap { .. } => "fastest-lap",
            RaceEventKind::LeaderChange { .. } => "leader-change",
        }
    }
}

/// Ordered fan-out of events to any number of subscribers
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Vec<mpsc::UnboundedSender<RaceEvent>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<RaceEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    /// Deliver to every live subscriber, dropping those that hung up
    pub fn publish(&mut self, event: RaceEvent) {
        trace!(event = event.name(), session_time = event.session_time, "Publishing event");
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
