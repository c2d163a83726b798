//! Race state orchestration
//!
//! [`RaceEngine`] receives two independent inputs: high-rate telemetry
//! snapshots and low-rate session documents. It keeps the derived state
//! (drivers, standings, live ranks, gaps) consistent across both and publishes
//! a [`RaceEvent`] whenever that state crosses a boundary worth reporting.
//!
//! ## Session lifecycle
//!
//! The engine has no session until the first telemetry snapshot arrives.
//! From then on, a telemetry snapshot that reports a different session number
//! schedules two reloads which run on the next session document:
//!
//! - static data (track, event type) is re-derived and the gap estimator is
//!   rebuilt for the new track length, followed by `StaticInfoChanged`
//! - the driver list is cleared and rebuilt from the roster
//!
//! Session documents that arrive before any telemetry are stored but not
//! processed.
//!
//! ## Event order
//!
//! Within one session document pass: `StaticInfoChanged`, driver swaps,
//! leader changes and fastest laps, then `SessionInfoUpdated`. Within one
//! telemetry pass: pit stop phases, then `TelemetryUpdated`.

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, trace};

use crate::config::EngineConfig;
use crate::events::{EventBus, RaceEvent, RaceEventKind};
use crate::gap::GapEstimator;
use crate::model::{Driver, PitstopPhase, SessionData};
use crate::ranking::{assign_gaps, compute_live_positions};
use crate::registry::DriverRegistry;
use crate::results::{resolve_qualifying, resolve_race};
use crate::session::SessionDocument;
use crate::types::TelemetrySnapshot;
use crate::Result;

/// Link state as reported by the snapshot source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No connection event seen yet, snapshots are processed
    #[default]
    Unknown,
    Connected,
    /// Snapshots are ignored until the next connection
    Disconnected,
}

/// Derived race state fed by telemetry and session documents
#[derive(Debug)]
pub struct RaceEngine {
    config: EngineConfig,
    connection: ConnectionState,

    telemetry: Option<Arc<TelemetrySnapshot>>,
    previous_telemetry: Option<Arc<TelemetrySnapshot>>,
    session: Option<Arc<SessionDocument>>,
    previous_session: Option<Arc<SessionDocument>>,

    current_session_number: Option<i32>,
    must_update_session_data: bool,
    must_reload_drivers: bool,

    session_data: SessionData,
    registry: DriverRegistry,
    gap_estimator: Option<GapEstimator>,
    events: EventBus,
}

impl Default for RaceEngine {
    fn default() -> Self {
        Self::with_valid_config(EngineConfig::default())
    }
}

impl RaceEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_valid_config(config))
    }

    fn with_valid_config(config: EngineConfig) -> Self {
        Self {
            registry: DriverRegistry::new(config.max_cars),
            config,
            connection: ConnectionState::Unknown,
            telemetry: None,
            previous_telemetry: None,
            session: None,
            previous_session: None,
            current_session_number: None,
            must_update_session_data: true,
            must_reload_drivers: false,
            session_data: SessionData::default(),
            gap_estimator: None,
            events: EventBus::new(),
        }
    }

    /// Receive every event published from now on
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<RaceEvent> {
        self.events.subscribe()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection
    }

    pub fn is_connected(&self) -> bool {
        self.connection == ConnectionState::Connected
    }

    pub fn telemetry(&self) -> Option<&TelemetrySnapshot> {
        self.telemetry.as_deref()
    }

    pub fn previous_telemetry(&self) -> Option<&TelemetrySnapshot> {
        self.previous_telemetry.as_deref()
    }

    pub fn session(&self) -> Option<&Arc<SessionDocument>> {
        self.session.as_ref()
    }

    pub fn previous_session(&self) -> Option<&Arc<SessionDocument>> {
        self.previous_session.as_ref()
    }

    pub fn session_data(&self) -> &SessionData {
        &self.session_data
    }

    pub fn drivers(&self) -> &[Driver] {
        self.registry.drivers()
    }

    pub fn driver(&self, slot: usize) -> Option<&Driver> {
        self.registry.driver(slot)
    }

    pub fn current_session_number(&self) -> Option<i32> {
        self.current_session_number
    }

    pub fn gap_estimator(&self) -> Option<&GapEstimator> {
        self.gap_estimator.as_ref()
    }

    /// Last known session time, 0 before any telemetry
    fn session_time(&self) -> f64 {
        self.telemetry.as_ref().map_or(0.0, |t| t.session_time)
    }

    fn publish(&mut self, kind: RaceEventKind) {
        let event = RaceEvent::new(self.session_time(), kind);
        self.events.publish(event);
    }

    pub fn on_connected(&mut self) {
        info!("Snapshot source connected");
        self.connection = ConnectionState::Connected;
        self.publish(RaceEventKind::Connected);
    }

    pub fn on_disconnected(&mut self) {
        info!("Snapshot source disconnected, suspending updates");
        self.connection = ConnectionState::Disconnected;
        self.publish(RaceEventKind::Disconnected);
    }

    /// Process one telemetry snapshot
    pub fn on_telemetry(&mut self, telemetry: TelemetrySnapshot) {
        if self.connection == ConnectionState::Disconnected {
            trace!("Ignoring telemetry while disconnected");
            return;
        }

        let telemetry = Arc::new(telemetry);
        self.previous_telemetry = self.telemetry.replace(Arc::clone(&telemetry));

        if self.current_session_number != Some(telemetry.session_number) {
            info!(
                previous = ?self.current_session_number,
                current = telemetry.session_number,
                "Session changed"
            );
            self.must_update_session_data = true;
            self.must_reload_drivers = true;
        }
        self.current_session_number = Some(telemetry.session_number);

        self.session_data.update_state(telemetry.session_state);
        self.update_driver_telemetry(&telemetry);
        self.session_data.update_telemetry(&telemetry);

        trace!(
            session_time = telemetry.session_time,
            drivers = self.registry.len(),
            "Telemetry processed"
        );
        self.publish(RaceEventKind::TelemetryUpdated(telemetry));
    }

    fn update_driver_telemetry(&mut self, telemetry: &TelemetrySnapshot) {
        let previous = self.previous_telemetry.as_deref();
        let track_length_km = self.session_data.track.length_km;

        let mut pit_events = Vec::new();
        for driver in self.registry.drivers_mut() {
            let was_in_world = driver.live.in_world;
            let phases = driver.update_live(telemetry, previous, track_length_km);
            // a car appearing in the pits is not a stop
            if !was_in_world {
                continue;
            }
            for phase in phases {
                debug!(slot = driver.slot, name = %driver.name, ?phase, "Pit stop phase");
                pit_events.push(RaceEventKind::Pitstop { phase, driver: Box::new(driver.clone()) });
            }
        }

        let leader = compute_live_positions(self.registry.drivers_mut(), self.session_data.event_type);
        if let Some(leader) = leader.and_then(|slot| self.registry.driver(slot)) {
            self.session_data.leader_lap = leader.results.current.laps_complete + 1;
        }

        if let Some(estimator) = self.gap_estimator.as_mut() {
            estimator.update(telemetry.session_time, &telemetry.car_idx_lap_dist_pct);
            assign_gaps(self.registry.drivers_mut(), estimator);
        }

        for kind in pit_events {
            self.publish(kind);
        }
    }

    /// Process one session document
    pub fn on_session(&mut self, document: Arc<SessionDocument>) {
        if self.connection == ConnectionState::Disconnected {
            trace!("Ignoring session document while disconnected");
            return;
        }

        self.previous_session = self.session.replace(Arc::clone(&document));

        let Some(session_number) = self.current_session_number else {
            trace!(version = document.version(), "No session number yet, document stored");
            return;
        };
        let now = self.telemetry.as_ref().map(|t| t.session_time);

        if self.must_update_session_data {
            self.session_data.update_static(
                &document,
                session_number,
                self.config.default_track_length_km,
            );
            self.gap_estimator = Some(GapEstimator::new(
                self.session_data.track.length_km * 1000.0,
                self.config.gap_sample_interval,
                self.config.gap_history_capacity,
            ));
            self.must_update_session_data = false;

            debug!(
                session_number,
                track = %self.session_data.track.display_name,
                length_km = self.session_data.track.length_km,
                event_type = ?self.session_data.event_type,
                "Static session info updated"
            );
            self.publish(RaceEventKind::StaticInfoChanged);
        }

        let reload = std::mem::take(&mut self.must_reload_drivers);
        let swaps = self.registry.reconcile(&document, reload, now.unwrap_or(0.0));
        for swap in swaps {
            self.publish(RaceEventKind::DriverSwap(Box::new(swap)));
        }

        resolve_qualifying(&document, &mut self.registry);
        let result_events = resolve_race(
            &document,
            session_number,
            &mut self.registry,
            &mut self.session_data,
            now,
        );
        for event in result_events {
            self.events.publish(event);
        }

        self.publish(RaceEventKind::SessionInfoUpdated(document));
    }

    /// Report a pit stop phase detected outside the engine. Returns `false`
    /// when no driver occupies `slot`.
    pub fn notify_pitstop(&mut self, slot: usize, phase: PitstopPhase) -> bool {
        let Some(driver) = self.registry.driver(slot) else {
            return false;
        };
        let driver = Box::new(driver.clone());
        self.publish(RaceEventKind::Pitstop { phase, driver });
        true
    }
}
