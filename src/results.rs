//! Qualifying and race result resolution
//!
//! Posted standings are looked up position by position; a position that has
//! no car yet is skipped and picked up again on a later document.

use tracing::debug;

use crate::events::{RaceEvent, RaceEventKind};
use crate::model::SessionData;
use crate::registry::DriverRegistry;
use crate::session::SessionDocument;

/// Store qualifying standings (`QualifyResultsInfo.Results`, 0-based
/// positions) on the matching drivers
pub fn resolve_qualifying(document: &SessionDocument, registry: &mut DriverRegistry) {
    let table = document.query().get("QualifyResultsInfo").get("Results");
    let driver_count = registry.len();

    for position in 0..driver_count {
        let row = table.find("Position", position);
        let Some(slot) = row.get("CarIdx").try_get::<usize>() else {
            continue;
        };
        if let Some(driver) = registry.driver_mut(slot) {
            driver.update_qualifying_results_info(row, position as i32);
        }
    }
}

/// Store the standings of `session_number` (1-based positions) and return the
/// leader-change and fastest-lap events they imply
///
/// Events are only raised when `session_time` is known, i.e. once telemetry
/// has been seen.
pub fn resolve_race(
    document: &SessionDocument,
    session_number: i32,
    registry: &mut DriverRegistry,
    session_data: &mut SessionData,
    session_time: Option<f64>,
) -> Vec<RaceEvent> {
    let table = document
        .query()
        .get("SessionInfo")
        .get("Sessions")
        .find("SessionNum", session_number)
        .get("ResultsPositions");
    let driver_count = registry.len();
    let mut events = Vec::new();

    for position in 1..=driver_count {
        let row = table.find("Position", position);
        let Some(slot) = row.get("CarIdx").try_get::<usize>() else {
            continue;
        };
        let Some(driver) = registry.driver_mut(slot) else {
            continue;
        };

        let previous_class_position = driver.results.current.class_position;
        driver.update_results_info(session_number, row, position as i32);

        let Some(now) = session_time else {
            continue;
        };

        if previous_class_position > 1 && driver.results.current.class_position == 1 {
            debug!(slot, name = %driver.name, "New class leader");
            events.push(RaceEvent::new(
                now,
                RaceEventKind::LeaderChange { driver: Box::new(driver.clone()) },
            ));
        }

        if let Some(lap) = session_data.update_fastest_lap(driver.results.current.fastest_time, driver)
        {
            debug!(slot, name = %driver.name, time = lap.time, "New fastest lap");
            events.push(RaceEvent::new(
                now,
                RaceEventKind::FastestLap { driver: Box::new(driver.clone()), lap },
            ));
        }
    }
    events
}
