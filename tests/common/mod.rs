//! Shared fixtures for integration tests

#![allow(dead_code)] // JUSTIFICATION: each test binary uses a different subset of the fixtures.

use std::sync::Arc;

use pitwall_timing::{RaceEvent, SessionDocument, SessionState, TelemetrySnapshot};
use tokio::sync::mpsc;

/// `(slot, customer id, name, class id)`
pub type Entry<'a> = (usize, i32, &'a str, i32);

/// Session document with a roster and an empty race session 0
pub fn roster(track_km: f64, entries: &[Entry<'_>]) -> Arc<SessionDocument> {
    document(track_km, "Race", entries, &[])
}

/// Session document with a roster and race results for session 0
///
/// Rows are `(position, slot, class position 1-based, laps, fastest time)`.
pub fn document(
    track_km: f64,
    session_type: &str,
    entries: &[Entry<'_>],
    results: &[(usize, usize, i32, i32, f64)],
) -> Arc<SessionDocument> {
    let mut yaml = format!(
        "WeekendInfo:\n  TrackName: testring\n  TrackDisplayName: Test Ring\n  TrackLength: {} km\n\
         SessionInfo:\n  Sessions:\n  - SessionNum: 0\n    SessionType: {}\n",
        track_km, session_type
    );
    if !results.is_empty() {
        yaml.push_str("    ResultsPositions:\n");
        for (position, slot, class_position, laps, fastest) in results {
            yaml.push_str(&format!(
                "    - Position: {}\n      CarIdx: {}\n      ClassPosition: {}\n      LapsComplete: {}\n      FastestTime: {}\n",
                position,
                slot,
                class_position - 1,
                laps,
                fastest
            ));
        }
    }
    yaml.push_str("DriverInfo:\n  Drivers:\n");
    for (slot, customer_id, name, class_id) in entries {
        yaml.push_str(&format!(
            "  - CarIdx: {}\n    UserName: {}\n    UserID: {}\n    CarClassID: {}\n",
            slot, name, customer_id, class_id
        ));
    }
    Arc::new(SessionDocument::parse(&yaml).expect("fixture document parses"))
}

pub fn telemetry(time: f64, session: i32, positions: &[f32], laps: &[i32]) -> TelemetrySnapshot {
    TelemetrySnapshot::new(time, session, SessionState::Racing, positions.to_vec())
        .with_laps(laps.to_vec())
}

pub fn drain(rx: &mut mpsc::UnboundedReceiver<RaceEvent>) -> Vec<RaceEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn count(events: &[RaceEvent], name: &str) -> usize {
    events.iter().filter(|e| e.name() == name).count()
}
