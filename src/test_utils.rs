//! Test utilities for building session documents and telemetry
//!
//! Session documents are assembled as YAML text and parsed through
//! [`SessionDocument::parse`], so fixtures go through the same preprocessing
//! as documents coming from a live source.

use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::Arc;

use crate::session::SessionDocument;
use crate::types::{SessionState, TelemetrySnapshot};

#[derive(Debug, Clone)]
struct RosterEntry {
    slot: usize,
    customer_id: i32,
    name: String,
    class_id: i32,
}

#[derive(Debug, Clone)]
struct ResultRow {
    position: usize,
    slot: usize,
    class_position: i32,
    laps_complete: i32,
    fastest_time: Option<f64>,
}

#[derive(Debug, Clone, Default)]
struct SessionEntry {
    session_type: Option<String>,
    rows: Vec<ResultRow>,
}

/// Builder for session documents with a roster, sessions and result tables
#[derive(Debug, Clone)]
pub struct RosterBuilder {
    track_length_km: f64,
    event_type: String,
    drivers: Vec<RosterEntry>,
    sessions: BTreeMap<i32, SessionEntry>,
    qualifying: Vec<ResultRow>,
}

impl Default for RosterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RosterBuilder {
    pub fn new() -> Self {
        Self {
            track_length_km: 1.0,
            event_type: "Race".to_string(),
            drivers: Vec::new(),
            sessions: BTreeMap::new(),
            qualifying: Vec::new(),
        }
    }

    pub fn track_length_km(mut self, length: f64) -> Self {
        self.track_length_km = length;
        self
    }

    pub fn event_type(mut self, event_type: &str) -> Self {
        self.event_type = event_type.to_string();
        self
    }

    /// Add a roster entry
    pub fn driver(mut self, slot: usize, customer_id: i32, name: &str, class_id: i32) -> Self {
        self.drivers.push(RosterEntry { slot, customer_id, name: name.to_string(), class_id });
        self
    }

    /// Declare a session and its type
    pub fn session(mut self, session_number: i32, session_type: &str) -> Self {
        self.sessions.entry(session_number).or_default().session_type =
            Some(session_type.to_string());
        self
    }

    /// Add a standings row; `class_position` is 1-based and written 0-based
    /// the way the simulator publishes it
    pub fn result(
        mut self,
        session_number: i32,
        position: usize,
        slot: usize,
        class_position: i32,
        laps_complete: i32,
        fastest_time: Option<f64>,
    ) -> Self {
        self.sessions.entry(session_number).or_default().rows.push(ResultRow {
            position,
            slot,
            class_position,
            laps_complete,
            fastest_time,
        });
        self
    }

    /// Add a qualifying row at 0-based `position`
    pub fn qualify_result(mut self, position: usize, slot: usize, fastest_time: f64) -> Self {
        self.qualifying.push(ResultRow {
            position,
            slot,
            class_position: 0,
            laps_complete: 0,
            fastest_time: Some(fastest_time),
        });
        self
    }

    pub fn to_yaml(&self) -> String {
        let mut yaml = String::new();
        let _ = writeln!(yaml, "WeekendInfo:");
        let _ = writeln!(yaml, "  TrackName: testtrack");
        let _ = writeln!(yaml, "  TrackDisplayName: Test Track");
        let _ = writeln!(yaml, "  TrackLength: {} km", self.track_length_km);
        let _ = writeln!(yaml, "  EventType: {}", self.event_type);

        let _ = writeln!(yaml, "SessionInfo:");
        let _ = writeln!(yaml, "  Sessions:");
        for (number, session) in &self.sessions {
            let _ = writeln!(yaml, "  - SessionNum: {}", number);
            let session_type = session.session_type.as_deref().unwrap_or(&self.event_type);
            let _ = writeln!(yaml, "    SessionType: {}", session_type);
            if session.rows.is_empty() {
                continue;
            }
            let _ = writeln!(yaml, "    ResultsPositions:");
            for row in &session.rows {
                let _ = writeln!(yaml, "    - Position: {}", row.position);
                let _ = writeln!(yaml, "      CarIdx: {}", row.slot);
                let _ = writeln!(yaml, "      ClassPosition: {}", row.class_position - 1);
                let _ = writeln!(yaml, "      LapsComplete: {}", row.laps_complete);
                let _ = writeln!(yaml, "      FastestTime: {}", row.fastest_time.unwrap_or(-1.0));
            }
        }
        if self.sessions.is_empty() {
            let _ = writeln!(yaml, "  - SessionNum: 0");
            let _ = writeln!(yaml, "    SessionType: {}", self.event_type);
        }

        if !self.qualifying.is_empty() {
            let _ = writeln!(yaml, "QualifyResultsInfo:");
            let _ = writeln!(yaml, "  Results:");
            for row in &self.qualifying {
                let _ = writeln!(yaml, "  - Position: {}", row.position);
                let _ = writeln!(yaml, "    CarIdx: {}", row.slot);
                let _ = writeln!(yaml, "    FastestTime: {}", row.fastest_time.unwrap_or(-1.0));
            }
        }

        let _ = writeln!(yaml, "DriverInfo:");
        let _ = writeln!(yaml, "  Drivers:");
        for driver in &self.drivers {
            let _ = writeln!(yaml, "  - CarIdx: {}", driver.slot);
            let _ = writeln!(yaml, "    UserName: {}", driver.name);
            let _ = writeln!(yaml, "    UserID: {}", driver.customer_id);
            let _ = writeln!(yaml, "    CarClassID: {}", driver.class_id);
        }
        yaml
    }

    pub fn build(&self) -> SessionDocument {
        match SessionDocument::parse(&self.to_yaml()) {
            Ok(document) => document,
            Err(e) => panic!("fixture YAML did not parse: {}", e),
        }
    }

    pub fn build_arc(&self) -> Arc<SessionDocument> {
        Arc::new(self.build())
    }
}

/// Racing-state telemetry for the given lap fractions and lap counters
pub fn race_telemetry(
    session_time: f64,
    session_number: i32,
    positions: &[f32],
    laps: &[i32],
) -> TelemetrySnapshot {
    TelemetrySnapshot::new(session_time, session_number, SessionState::Racing, positions.to_vec())
        .with_laps(laps.to_vec())
}
