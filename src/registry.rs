//! Roster reconciliation and driver swap detection

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::model::Driver;
use crate::session::SessionDocument;

/// A change of competitor in a car slot without a session change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverSwap {
    pub slot: usize,
    pub previous_customer_id: i32,
    pub new_customer_id: i32,
    pub previous_name: String,
    pub new_name: String,
    pub session_time: f64,
    /// Driver record after the swap
    pub driver: Driver,
}

/// Car slot to driver mapping
#[derive(Debug, Clone)]
pub struct DriverRegistry {
    drivers: Vec<Driver>,
    max_cars: usize,
}

impl DriverRegistry {
    pub fn new(max_cars: usize) -> Self {
        Self { drivers: Vec::new(), max_cars }
    }

    /// Drivers in the order their slots were first seen
    pub fn drivers(&self) -> &[Driver] {
        &self.drivers
    }

    pub(crate) fn drivers_mut(&mut self) -> &mut [Driver] {
        &mut self.drivers
    }

    pub fn driver(&self, slot: usize) -> Option<&Driver> {
        self.drivers.iter().find(|d| d.slot == slot)
    }

    pub(crate) fn driver_mut(&mut self, slot: usize) -> Option<&mut Driver> {
        self.drivers.iter_mut().find(|d| d.slot == slot)
    }

    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }

    pub fn clear(&mut self) {
        self.drivers.clear();
    }

    /// Bring the driver list in line with the roster in `document`
    ///
    /// Slots are scanned from 0 upwards; the first slot that has neither a
    /// record nor a roster entry ends the scan. Existing records are
    /// refreshed in place and every change of customer id is returned as a
    /// [`DriverSwap`]. With `reload` set the list is rebuilt from scratch.
    pub fn reconcile(
        &mut self,
        document: &SessionDocument,
        reload: bool,
        session_time: f64,
    ) -> Vec<DriverSwap> {
        if reload {
            debug!(previous = self.drivers.len(), "Reloading driver list");
            self.drivers.clear();
        }

        let mut swaps = Vec::new();
        for slot in 0..self.max_cars {
            let Some(driver) = self.driver_mut(slot) else {
                match Driver::from_session(document, slot) {
                    Some(driver) => {
                        trace!(slot, name = %driver.name, "New driver in roster");
                        self.drivers.push(driver);
                        continue;
                    }
                    None => break,
                }
            };

            let previous_customer_id = driver.customer_id;
            let previous_name = driver.name.clone();
            if !driver.parse_dynamic_session_info(document) {
                continue;
            }

            if driver.customer_id != previous_customer_id {
                debug!(
                    slot,
                    from = %previous_name,
                    to = %driver.name,
                    "Driver swap detected"
                );
                swaps.push(DriverSwap {
                    slot,
                    previous_customer_id,
                    new_customer_id: driver.customer_id,
                    previous_name,
                    new_name: driver.name.clone(),
                    session_time,
                    driver: driver.clone(),
                });
            }
        }
        swaps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::RosterBuilder;

    #[test]
    fn builds_contiguous_slots_and_stops_at_gap() {
        let doc = RosterBuilder::new()
            .driver(0, 100, "Alice", 1)
            .driver(1, 101, "Bob", 1)
            .driver(3, 103, "Dave", 1)
            .build();

        let mut registry = DriverRegistry::new(70);
        let swaps = registry.reconcile(&doc, false, 0.0);
        assert!(swaps.is_empty());
        assert_eq!(registry.len(), 2);
        assert!(registry.driver(3).is_none());
    }

    #[test]
    fn respects_max_cars() {
        let doc = RosterBuilder::new()
            .driver(0, 100, "Alice", 1)
            .driver(1, 101, "Bob", 1)
            .driver(2, 102, "Carol", 1)
            .build();
        let mut registry = DriverRegistry::new(2);
        registry.reconcile(&doc, false, 0.0);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn detects_single_swap_with_identities() {
        let before = RosterBuilder::new().driver(0, 100, "Alice", 1).driver(1, 101, "Bob", 1).build();
        let after = RosterBuilder::new().driver(0, 100, "Alice", 1).driver(1, 201, "Bea", 1).build();

        let mut registry = DriverRegistry::new(70);
        registry.reconcile(&before, false, 0.0);
        let swaps = registry.reconcile(&after, false, 42.5);

        assert_eq!(swaps.len(), 1);
        let swap = &swaps[0];
        assert_eq!(swap.slot, 1);
        assert_eq!((swap.previous_customer_id, swap.new_customer_id), (101, 201));
        assert_eq!((swap.previous_name.as_str(), swap.new_name.as_str()), ("Bob", "Bea"));
        assert_eq!(swap.session_time, 42.5);
        assert_eq!(swap.driver.name, "Bea");

        // same roster again, nothing new
        assert!(registry.reconcile(&after, false, 43.0).is_empty());
    }

    #[test]
    fn name_change_alone_is_not_a_swap() {
        let before = RosterBuilder::new().driver(0, 100, "Alice", 1).build();
        let after = RosterBuilder::new().driver(0, 100, "Alice B", 1).build();
        let mut registry = DriverRegistry::new(70);
        registry.reconcile(&before, false, 0.0);
        assert!(registry.reconcile(&after, false, 1.0).is_empty());
        assert_eq!(registry.driver(0).unwrap().name, "Alice B");
    }

    #[test]
    fn reload_rebuilds_records() {
        let doc = RosterBuilder::new().driver(0, 100, "Alice", 1).build();
        let mut registry = DriverRegistry::new(70);
        registry.reconcile(&doc, false, 0.0);
        registry.driver_mut(0).unwrap().live.position = 5;

        let swaps = registry.reconcile(&doc, true, 0.0);
        assert!(swaps.is_empty());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.driver(0).unwrap().live.position, 0);
    }

    #[test]
    fn existing_records_survive_missing_roster_entries() {
        let full = RosterBuilder::new().driver(0, 100, "Alice", 1).driver(1, 101, "Bob", 1).build();
        let partial = RosterBuilder::new().driver(0, 100, "Alice", 1).build();
        let mut registry = DriverRegistry::new(70);
        registry.reconcile(&full, false, 0.0);
        registry.reconcile(&partial, false, 1.0);
        assert_eq!(registry.len(), 2);
    }
}
