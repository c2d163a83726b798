//! Live overall and class ranking, plus timing gaps
//!
//! In a race the order is taken from the track: whoever has covered the most
//! distance leads. In practice and qualifying, position on track means
//! nothing, so the simulator's posted standings (best lap order) are used.

use std::collections::BTreeMap;

use crate::gap::{Gap, GapEstimator};
use crate::model::{Driver, EventType};

/// Assign `live.position` and `live.class_position` to every driver and
/// return the slot of the overall leader
pub fn compute_live_positions(drivers: &mut [Driver], event_type: EventType) -> Option<usize> {
    if event_type.is_race() {
        rank_by_distance(drivers)
    } else {
        copy_result_positions(drivers)
    }
}

fn rank_by_distance(drivers: &mut [Driver]) -> Option<usize> {
    let mut order: Vec<usize> = (0..drivers.len()).collect();
    // sort_by is stable, ties keep list order
    order.sort_by(|&a, &b| {
        drivers[b].live.total_lap_distance.total_cmp(&drivers[a].live.total_lap_distance)
    });

    let mut classes: BTreeMap<i32, i32> = BTreeMap::new();
    for (rank, &index) in order.iter().enumerate() {
        let driver = &mut drivers[index];
        driver.live.position = rank as i32 + 1;

        let class_rank = classes.entry(driver.car.car_class_id).or_insert(0);
        *class_rank += 1;
        driver.live.class_position = *class_rank;
    }

    order.first().map(|&index| drivers[index].slot)
}

fn copy_result_positions(drivers: &mut [Driver]) -> Option<usize> {
    let mut leader: Option<(i32, usize)> = None;
    for driver in drivers.iter_mut() {
        let result = &driver.results.current;
        driver.live.position = result.position;
        driver.live.class_position = result.class_position;

        if result.position > 0 && leader.is_none_or(|(best, _)| result.position < best) {
            leader = Some((result.position, driver.slot));
        }
    }
    leader.map(|(_, slot)| slot)
}

/// Fill `gap_to_leader` and `gap_to_next` following live position order
///
/// Drivers without a position (0) go to the back of the chain.
pub fn assign_gaps(drivers: &mut [Driver], estimator: &GapEstimator) {
    let mut order: Vec<usize> = (0..drivers.len()).collect();
    order.sort_by_key(|&index| match drivers[index].live.position {
        position if position > 0 => position,
        _ => i32::MAX,
    });

    let Some(&leader_index) = order.first() else {
        return;
    };
    let leader_slot = drivers[leader_index].slot;
    let leader_distance = drivers[leader_index].live.total_lap_distance;
    drivers[leader_index].live.gap_to_leader = Gap::Reference;
    drivers[leader_index].live.gap_to_next = Gap::Reference;

    for pair in order.windows(2) {
        let (ahead_index, behind_index) = (pair[0], pair[1]);
        let ahead_slot = drivers[ahead_index].slot;
        let ahead_distance = drivers[ahead_index].live.total_lap_distance;

        let behind = &mut drivers[behind_index];
        let to_leader = leader_distance - behind.live.total_lap_distance;
        let to_next = ahead_distance - behind.live.total_lap_distance;

        behind.live.gap_to_leader =
            Gap::from_lap_difference(to_leader, estimator.delta(behind.slot, leader_slot));
        behind.live.gap_to_next =
            Gap::from_lap_difference(to_next, estimator.delta(behind.slot, ahead_slot));
    }
}
