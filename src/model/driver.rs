//! Driver records
//!
//! One [`Driver`] exists per occupied car slot. Identity fields are re-read
//! from the roster on every session document, live fields from every
//! telemetry snapshot, and result fields from the posted standings.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::gap::Gap;
use crate::session::{Query, SessionDocument};
use crate::types::{TelemetrySnapshot, TrackSurface};

/// Customer id used when the roster entry carries none
pub const UNKNOWN_CUSTOMER_ID: i32 = -1;

/// Pit stop phase transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PitstopPhase {
    EnterPitLane,
    EnterPitStall,
    ExitPitStall,
    ExitPitLane,
}

/// Static car metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Car {
    pub car_number: Option<String>,
    pub car_class_id: i32,
    pub car_class_short_name: Option<String>,
    pub car_name: Option<String>,
}

/// Values derived from telemetry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DriverLive {
    /// Lap counter, from telemetry or completed laps in the standings
    pub lap: i32,
    /// Fraction of the current lap, 0.0..1.0
    pub lap_distance: f32,
    /// `lap + lap_distance`
    pub total_lap_distance: f64,
    /// Overall rank, 0 until computed
    pub position: i32,
    /// Rank within the car class, 0 until computed
    pub class_position: i32,
    pub gap_to_leader: Gap,
    pub gap_to_next: Gap,
    pub speed_kph: f64,
    pub in_world: bool,
    pub on_pit_road: bool,
    pub track_surface: TrackSurface,
}

/// Standing of one driver in one session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionResult {
    /// Overall position, 1-based, 0 when not classified
    pub position: i32,
    /// Class position, 1-based, 0 when not classified
    pub class_position: i32,
    pub laps_complete: i32,
    pub fastest_time: Option<f64>,
    pub fastest_lap: Option<i32>,
    pub last_time: Option<f64>,
    pub incidents: Option<i32>,
}

impl SessionResult {
    /// Read a standings row. `ClassPosition` is published 0-based and stored
    /// 1-based; `position` is the caller's already 1-based row position.
    fn from_query(row: Query<'_>, position: i32) -> Self {
        Self {
            position,
            class_position: row.get("ClassPosition").try_get::<i32>().map_or(0, |p| p + 1),
            laps_complete: row.get("LapsComplete").try_get().unwrap_or(0),
            fastest_time: row.get("FastestTime").try_get::<f64>().filter(|t| *t > 0.0),
            fastest_lap: row.get("FastestLap").try_get::<i32>().filter(|lap| *lap > 0),
            last_time: row.get("LastTime").try_get::<f64>().filter(|t| *t > 0.0),
            incidents: row.get("Incidents").try_get(),
        }
    }
}

/// Current and historical standings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DriverResults {
    /// Standing in the session currently being resolved
    pub current: SessionResult,
    /// Standing per session number
    pub sessions: BTreeMap<i32, SessionResult>,
    /// Qualifying standing, when posted
    pub qualifying: Option<SessionResult>,
}

/// A competitor bound to a car slot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    /// Car slot (`CarIdx`), stable for the session
    pub slot: usize,
    /// Competitor currently driving the car; changes on a driver swap
    pub customer_id: i32,
    pub name: String,
    pub short_name: Option<String>,
    pub team_name: Option<String>,
    pub car: Car,
    pub is_pace_car: bool,
    pub is_spectator: bool,
    pub live: DriverLive,
    pub results: DriverResults,
}

impl Driver {
    /// Build a driver from the roster entry for `slot`, `None` when the
    /// roster has no such entry
    pub fn from_session(document: &SessionDocument, slot: usize) -> Option<Self> {
        let entry = roster_entry(document, slot);
        if !entry.exists() {
            return None;
        }

        let mut driver = Driver { slot, customer_id: UNKNOWN_CUSTOMER_ID, ..Default::default() };
        driver.car = Car {
            car_number: entry.get("CarNumber").as_string(),
            car_class_id: entry.get("CarClassID").try_get().unwrap_or(0),
            car_class_short_name: entry.get("CarClassShortName").as_string(),
            car_name: entry.get("CarScreenName").as_string(),
        };
        driver.is_pace_car = entry.get("CarIsPaceCar").try_get::<i32>() == Some(1);
        driver.apply_identity(entry);
        Some(driver)
    }

    /// Re-read identity fields from the roster. Returns `false` when the
    /// slot's roster entry is gone.
    pub fn parse_dynamic_session_info(&mut self, document: &SessionDocument) -> bool {
        let entry = roster_entry(document, self.slot);
        if !entry.exists() {
            return false;
        }
        self.apply_identity(entry);
        true
    }

    fn apply_identity(&mut self, entry: Query<'_>) {
        if let Some(customer_id) = entry.get("UserID").try_get() {
            self.customer_id = customer_id;
        }
        if let Some(name) = entry.get("UserName").as_string() {
            self.name = name;
        }
        self.short_name = entry.get("AbbrevName").as_string();
        self.team_name = entry.get("TeamName").as_string();
        self.is_spectator = entry.get("IsSpectator").try_get::<i32>() == Some(1);
    }

    /// Update live values from a telemetry snapshot and return pit phase
    /// transitions detected since the previous snapshot
    pub fn update_live(
        &mut self,
        telemetry: &TelemetrySnapshot,
        previous: Option<&TelemetrySnapshot>,
        track_length_km: f64,
    ) -> Vec<PitstopPhase> {
        let slot = self.slot;
        let Some(pct) = telemetry.lap_dist_pct(slot) else {
            self.live.in_world = false;
            self.live.speed_kph = 0.0;
            return Vec::new();
        };

        self.live.in_world = true;
        self.live.lap = telemetry.lap(slot).unwrap_or(self.results.current.laps_complete);
        self.live.lap_distance = pct;
        self.live.total_lap_distance = f64::from(self.live.lap) + f64::from(pct);
        self.live.speed_kph = previous
            .and_then(|previous| lap_fraction_travelled(previous, telemetry, slot))
            .map_or(0.0, |(laps, dt)| laps * track_length_km / dt * 3600.0);

        self.update_pit_state(telemetry)
    }

    fn update_pit_state(&mut self, telemetry: &TelemetrySnapshot) -> Vec<PitstopPhase> {
        let mut phases = Vec::new();
        let slot = self.slot;

        let surface = telemetry.track_surface(slot);
        let on_pit_road = telemetry.on_pit_road(slot);

        if on_pit_road == Some(true) && !self.live.on_pit_road {
            phases.push(PitstopPhase::EnterPitLane);
        }
        if let Some(surface) = surface {
            let was_in_stall = self.live.track_surface == TrackSurface::InPitStall;
            let in_stall = surface == TrackSurface::InPitStall;
            if in_stall && !was_in_stall {
                phases.push(PitstopPhase::EnterPitStall);
            } else if was_in_stall && !in_stall {
                phases.push(PitstopPhase::ExitPitStall);
            }
            self.live.track_surface = surface;
        }
        if on_pit_road == Some(false) && self.live.on_pit_road {
            phases.push(PitstopPhase::ExitPitLane);
        }
        if let Some(on_pit_road) = on_pit_road {
            self.live.on_pit_road = on_pit_road;
        }

        phases
    }

    /// Store a posted race or practice standing for `session_number`
    pub fn update_results_info(&mut self, session_number: i32, row: Query<'_>, position: i32) {
        let result = SessionResult::from_query(row, position);
        self.results.sessions.insert(session_number, result.clone());
        self.results.current = result;
    }

    /// Store the qualifying standing found at 0-based `position`
    pub fn update_qualifying_results_info(&mut self, row: Query<'_>, position: i32) {
        self.results.qualifying = Some(SessionResult::from_query(row, position + 1));
    }

    /// Standing for a past or current session
    pub fn session_result(&self, session_number: i32) -> Option<&SessionResult> {
        self.results.sessions.get(&session_number)
    }
}

fn roster_entry(document: &SessionDocument, slot: usize) -> Query<'_> {
    document.query().get("DriverInfo").get("Drivers").find("CarIdx", slot)
}

/// Lap fraction covered by `slot` between two snapshots, with elapsed time
fn lap_fraction_travelled(
    previous: &TelemetrySnapshot,
    current: &TelemetrySnapshot,
    slot: usize,
) -> Option<(f64, f64)> {
    let dt = current.session_time - previous.session_time;
    if dt <= 0.0 {
        return None;
    }
    let before = f64::from(previous.lap_dist_pct(slot)?);
    let now = f64::from(current.lap_dist_pct(slot)?);

    let mut laps = now - before;
    if laps < -0.5 {
        // crossed the line
        laps += 1.0;
    }
    (laps >= 0.0).then_some((laps, dt))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SessionState;

    const ROSTER: &str = r#"
DriverInfo:
  Drivers:
  - CarIdx: 0
    UserName: Pace Car
    UserID: -1
    CarIsPaceCar: 1
    CarClassID: 11
  - CarIdx: 1
    UserName: Alice Smith
    AbbrevName: Smith, A
    UserID: 1001
    TeamName: Blue Team
    CarNumber: "7"
    CarClassID: 2523
    CarClassShortName: GT3
"#;

    fn telemetry(time: f64, pct: Vec<f32>) -> TelemetrySnapshot {
        TelemetrySnapshot::new(time, 0, SessionState::Racing, pct)
    }

    #[test]
    fn from_session_reads_roster_entry() {
        let doc = SessionDocument::parse(ROSTER).unwrap();
        let driver = Driver::from_session(&doc, 1).expect("slot 1 exists");
        assert_eq!(driver.customer_id, 1001);
        assert_eq!(driver.name, "Alice Smith");
        assert_eq!(driver.team_name.as_deref(), Some("Blue Team"));
        assert_eq!(driver.car.car_class_id, 2523);
        assert_eq!(driver.car.car_number.as_deref(), Some("7"));
        assert!(!driver.is_pace_car);

        let pace = Driver::from_session(&doc, 0).unwrap();
        assert!(pace.is_pace_car);
        assert!(Driver::from_session(&doc, 2).is_none());
    }

    #[test]
    fn live_update_computes_total_distance_and_speed() {
        let doc = SessionDocument::parse(ROSTER).unwrap();
        let mut driver = Driver::from_session(&doc, 1).unwrap();

        let first = telemetry(10.0, vec![0.0, 0.95]).with_laps(vec![0, 2]);
        driver.update_live(&first, None, 3.6);
        assert_eq!(driver.live.lap, 2);
        assert!((driver.live.total_lap_distance - 2.95).abs() < 1e-6);
        assert_eq!(driver.live.speed_kph, 0.0);

        // 0.1 lap of a 3.6 km track in 2 s, across the line
        let second = telemetry(12.0, vec![0.0, 0.05]).with_laps(vec![0, 3]);
        driver.update_live(&second, Some(&first), 3.6);
        assert!((driver.live.speed_kph - 648.0).abs() < 0.1);
    }

    #[test]
    fn live_update_falls_back_to_completed_laps() {
        let doc = SessionDocument::parse(ROSTER).unwrap();
        let mut driver = Driver::from_session(&doc, 1).unwrap();
        driver.results.current.laps_complete = 4;

        driver.update_live(&telemetry(1.0, vec![0.0, 0.5]), None, 1.0);
        assert!((driver.live.total_lap_distance - 4.5).abs() < 1e-6);
    }

    #[test]
    fn car_not_in_world_keeps_last_distance() {
        let doc = SessionDocument::parse(ROSTER).unwrap();
        let mut driver = Driver::from_session(&doc, 1).unwrap();
        driver.update_live(&telemetry(1.0, vec![0.0, 0.5]), None, 1.0);
        driver.update_live(&telemetry(2.0, vec![0.0, -1.0]), None, 1.0);
        assert!(!driver.live.in_world);
        assert_eq!(driver.live.lap_distance, 0.5);
    }

    #[test]
    fn pit_phases_follow_pit_road_and_stall_edges() {
        let doc = SessionDocument::parse(ROSTER).unwrap();
        let mut driver = Driver::from_session(&doc, 1).unwrap();
        let step = |on_pit: bool, surface: TrackSurface| {
            telemetry(0.0, vec![0.0, 0.5])
                .with_pit_state(vec![false, on_pit], vec![TrackSurface::OnTrack, surface])
        };

        assert!(driver.update_live(&step(false, TrackSurface::OnTrack), None, 1.0).is_empty());
        assert_eq!(
            driver.update_live(&step(true, TrackSurface::ApproachingPits), None, 1.0),
            vec![PitstopPhase::EnterPitLane]
        );
        assert_eq!(
            driver.update_live(&step(true, TrackSurface::InPitStall), None, 1.0),
            vec![PitstopPhase::EnterPitStall]
        );
        assert!(driver.update_live(&step(true, TrackSurface::InPitStall), None, 1.0).is_empty());
        assert_eq!(
            driver.update_live(&step(true, TrackSurface::ApproachingPits), None, 1.0),
            vec![PitstopPhase::ExitPitStall]
        );
        assert_eq!(
            driver.update_live(&step(false, TrackSurface::OnTrack), None, 1.0),
            vec![PitstopPhase::ExitPitLane]
        );
    }

    #[test]
    fn results_rows_are_stored_per_session() {
        let doc = SessionDocument::parse(
            "Row:\n  ClassPosition: 0\n  LapsComplete: 12\n  FastestTime: 88.4\n  LastTime: -1\n",
        )
        .unwrap();
        let mut driver = Driver::default();
        driver.update_results_info(2, doc.query().get("Row"), 1);

        let result = driver.session_result(2).unwrap();
        assert_eq!(result.position, 1);
        assert_eq!(result.class_position, 1);
        assert_eq!(result.laps_complete, 12);
        assert_eq!(result.fastest_time, Some(88.4));
        assert_eq!(result.last_time, None);
        assert_eq!(&driver.results.current, result);
    }
}
