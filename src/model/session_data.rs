//! Session-level aggregates

use serde::{Deserialize, Serialize};

use super::Driver;
use crate::session::SessionDocument;
use crate::types::{SessionState, TelemetrySnapshot};

/// Kind of session, decides how live positions are computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EventType {
    Practice,
    Qualifying,
    Race,
    Test,
    #[default]
    Unknown,
}

impl EventType {
    /// Classify a session type label such as "Race", "Open Qualify",
    /// "Lone Qualify", "Practice" or "Offline Testing"
    pub fn from_label(label: &str) -> Self {
        let label = label.to_ascii_lowercase();
        if label.contains("race") {
            EventType::Race
        } else if label.contains("qualify") {
            EventType::Qualifying
        } else if label.contains("practice") || label.contains("warmup") {
            EventType::Practice
        } else if label.contains("test") {
            EventType::Test
        } else {
            EventType::Unknown
        }
    }

    pub fn is_race(self) -> bool {
        self == EventType::Race
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub name: String,
    pub display_name: String,
    pub length_km: f64,
}

/// Best lap of the session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestLap {
    pub slot: usize,
    pub customer_id: i32,
    pub driver_name: String,
    /// Lap time in seconds
    pub time: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    pub track: Track,
    pub event_type: EventType,
    pub state: SessionState,
    pub session_number: Option<i32>,
    pub session_time: f64,
    /// Lap the session leader is currently on
    pub leader_lap: i32,
    pub fastest_lap: Option<BestLap>,
}

impl SessionData {
    /// Derive static data (track, event type) for `session_number`
    pub fn update_static(
        &mut self,
        document: &SessionDocument,
        session_number: i32,
        default_track_length_km: f64,
    ) {
        let weekend = document.query().get("WeekendInfo");

        self.track = Track {
            name: weekend.get("TrackName").as_string().unwrap_or_default(),
            display_name: weekend.get("TrackDisplayName").as_string().unwrap_or_default(),
            length_km: weekend
                .get("TrackLength")
                .as_string()
                .and_then(|length| parse_track_length_km(&length))
                .unwrap_or(default_track_length_km),
        };

        let session_type = document
            .query()
            .get("SessionInfo")
            .get("Sessions")
            .find("SessionNum", session_number)
            .get("SessionType")
            .as_string()
            .or_else(|| weekend.get("EventType").as_string());
        self.event_type = session_type.as_deref().map_or(EventType::Unknown, EventType::from_label);
        self.session_number = Some(session_number);
        self.leader_lap = 0;
        self.fastest_lap = None;
    }

    pub fn update_state(&mut self, state: SessionState) {
        self.state = state;
    }

    pub fn update_telemetry(&mut self, telemetry: &TelemetrySnapshot) {
        self.session_time = telemetry.session_time;
        self.session_number = Some(telemetry.session_number);
    }

    /// Offer a driver's fastest time; returns the new best lap when it
    /// improves on the session's best
    pub fn update_fastest_lap(&mut self, time: Option<f64>, driver: &Driver) -> Option<BestLap> {
        let time = time.filter(|t| t.is_finite() && *t > 0.0)?;
        if self.fastest_lap.as_ref().is_some_and(|best| best.time <= time) {
            return None;
        }

        let lap = BestLap {
            slot: driver.slot,
            customer_id: driver.customer_id,
            driver_name: driver.name.clone(),
            time,
        };
        self.fastest_lap = Some(lap.clone());
        Some(lap)
    }
}

/// Parse "5.43 km" or "3.37 mi" into kilometres
fn parse_track_length_km(length: &str) -> Option<f64> {
    let mut parts = length.split_whitespace();
    let value: f64 = parts.next()?.parse().ok()?;
    let km = match parts.next() {
        Some("mi") => value * 1.609_344,
        Some("m") => value / 1000.0,
        _ => value,
    };
    (km.is_finite() && km > 0.0).then_some(km)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"
WeekendInfo:
  TrackName: spa 2024 gp
  TrackDisplayName: Circuit de Spa-Francorchamps
  TrackLength: 6.93 km
  EventType: Race
SessionInfo:
  Sessions:
  - SessionNum: 0
    SessionType: Practice
  - SessionNum: 1
    SessionType: Lone Qualify
  - SessionNum: 2
    SessionType: Race
"#;

    #[test]
    fn event_type_labels() {
        assert_eq!(EventType::from_label("Race"), EventType::Race);
        assert_eq!(EventType::from_label("Open Qualify"), EventType::Qualifying);
        assert_eq!(EventType::from_label("Practice"), EventType::Practice);
        assert_eq!(EventType::from_label("Offline Testing"), EventType::Test);
        assert_eq!(EventType::from_label("Heat"), EventType::Unknown);
    }

    #[test]
    fn track_length_units() {
        assert_eq!(parse_track_length_km("6.93 km"), Some(6.93));
        assert!((parse_track_length_km("2.5 mi").unwrap() - 4.02336).abs() < 1e-9);
        assert_eq!(parse_track_length_km("800 m"), Some(0.8));
        assert_eq!(parse_track_length_km("unknown"), None);
        assert_eq!(parse_track_length_km("-1 km"), None);
    }

    #[test]
    fn static_data_follows_session_type() {
        let doc = SessionDocument::parse(DOC).unwrap();
        let mut data = SessionData::default();

        data.update_static(&doc, 1, 1.0);
        assert_eq!(data.event_type, EventType::Qualifying);
        assert_eq!(data.track.length_km, 6.93);
        assert_eq!(data.track.display_name, "Circuit de Spa-Francorchamps");

        data.update_static(&doc, 2, 1.0);
        assert_eq!(data.event_type, EventType::Race);

        // unknown session falls back to the weekend's event type
        data.update_static(&doc, 9, 1.0);
        assert_eq!(data.event_type, EventType::Race);
    }

    #[test]
    fn missing_track_length_uses_default() {
        let doc = SessionDocument::parse("WeekendInfo:\n  TrackLength: n/a\n").unwrap();
        let mut data = SessionData::default();
        data.update_static(&doc, 0, 4.2);
        assert_eq!(data.track.length_km, 4.2);
        assert_eq!(data.event_type, EventType::Unknown);
    }

    #[test]
    fn fastest_lap_only_improves() {
        let mut data = SessionData::default();
        let alice = Driver { slot: 1, customer_id: 10, name: "Alice".into(), ..Default::default() };
        let bob = Driver { slot: 2, customer_id: 20, name: "Bob".into(), ..Default::default() };

        assert!(data.update_fastest_lap(None, &alice).is_none());
        assert!(data.update_fastest_lap(Some(-1.0), &alice).is_none());

        let lap = data.update_fastest_lap(Some(90.0), &alice).unwrap();
        assert_eq!(lap.slot, 1);
        assert!(data.update_fastest_lap(Some(90.0), &bob).is_none());
        assert!(data.update_fastest_lap(Some(91.0), &bob).is_none());

        let lap = data.update_fastest_lap(Some(89.5), &bob).unwrap();
        assert_eq!(lap.driver_name, "Bob");
        assert_eq!(data.fastest_lap.as_ref().map(|l| l.time), Some(89.5));
    }
}
