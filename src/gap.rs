//! Inter-car gap estimation
//!
//! The simulator reports where each car is on the lap, not how far apart the
//! cars are in time. [`GapEstimator`] keeps a short history of
//! `(session time, lap fraction)` samples per car slot and answers "how long
//! ago was the car ahead where the car behind is now" by interpolating
//! between the two samples that straddle that position.
//!
//! ```rust
//! use pitwall_timing::gap::GapEstimator;
//!
//! let mut gaps = GapEstimator::new(1000.0, 1.0, 64);
//! gaps.update(0.0, &[0.0, -1.0]);
//! gaps.update(10.0, &[0.1, -1.0]);
//! gaps.update(12.0, &[-1.0, 0.05]);
//!
//! let delta = gaps.delta(1, 0).unwrap();
//! assert!((delta - 7.0).abs() < 1e-6);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use tracing::trace;

const POSITION_EPSILON: f64 = 1e-9;

/// Gap from one car to another as shown on a timing screen
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum Gap {
    /// The car the gap is measured to (leader, or head of a chain)
    Reference,
    /// One or more laps down
    Laps(u32),
    /// Seconds behind
    Time(f64),
    /// Not enough history to estimate
    #[default]
    Unavailable,
}

impl Gap {
    /// Apply the display policy: a lap difference of one or more is shown
    /// as whole laps, anything closer as the interpolated time
    pub fn from_lap_difference(lap_difference: f64, delta: Option<f64>) -> Self {
        let laps = lap_difference.abs();
        if laps >= 1.0 {
            Gap::Laps(laps.floor() as u32)
        } else {
            delta.map_or(Gap::Unavailable, Gap::Time)
        }
    }

    pub fn seconds(&self) -> Option<f64> {
        match self {
            Gap::Time(seconds) => Some(*seconds),
            _ => None,
        }
    }
}

impl fmt::Display for Gap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gap::Reference => f.write_str("-"),
            Gap::Laps(laps) => write!(f, "{} L", laps),
            Gap::Time(seconds) => write!(f, "{:.3}", seconds),
            Gap::Unavailable => f.write_str("N/A"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Sample {
    time: f64,
    position: f64,
}

/// Fixed-capacity sample history of one car
#[derive(Debug, Clone, Default)]
struct GapHistory {
    samples: VecDeque<Sample>,
}

impl GapHistory {
    fn push(&mut self, sample: Sample, capacity: usize) {
        if self.samples.len() >= capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Most recent session time at which this car was at `position`
    fn time_at(&self, position: f64) -> Option<f64> {
        let newest_first = self.samples.iter().rev();
        let older = self.samples.iter().rev().skip(1);

        for (later, earlier) in newest_first.zip(older) {
            let start = earlier.position;
            let mut end = later.position;
            if end < start {
                // only a large drop is a line crossing; small ones are roll-back
                if start - end <= 0.5 {
                    continue;
                }
                end += 1.0;
            }
            let span = end - start;

            for target in [position, position + 1.0] {
                if target < start - POSITION_EPSILON || target > end + POSITION_EPSILON {
                    continue;
                }
                if span <= POSITION_EPSILON {
                    return Some(later.time);
                }
                let fraction = ((target - start) / span).clamp(0.0, 1.0);
                return Some(earlier.time + fraction * (later.time - earlier.time));
            }
        }
        None
    }
}

/// Per-car position history and gap interpolation
#[derive(Debug, Clone)]
pub struct GapEstimator {
    track_length_m: f64,
    sample_interval: f64,
    capacity: usize,
    histories: Vec<GapHistory>,
    current_positions: Vec<Option<f64>>,
    current_time: Option<f64>,
}

impl GapEstimator {
    /// Create an estimator for a track of `track_length_m` metres that keeps
    /// up to `capacity` samples per car, at most one every `sample_interval`
    /// seconds
    pub fn new(track_length_m: f64, sample_interval: f64, capacity: usize) -> Self {
        Self {
            track_length_m,
            sample_interval: sample_interval.max(0.0),
            capacity: capacity.max(2),
            histories: Vec::new(),
            current_positions: Vec::new(),
            current_time: None,
        }
    }

    pub fn track_length_m(&self) -> f64 {
        self.track_length_m
    }

    /// Record the positions of all cars at `session_time`
    ///
    /// Negative or non-finite positions mean the car is not in the world; its
    /// history is kept but it has no current position.
    pub fn update(&mut self, session_time: f64, positions: &[f32]) {
        if positions.len() > self.histories.len() {
            self.histories.resize_with(positions.len(), GapHistory::default);
            self.current_positions.resize(positions.len(), None);
        }

        if self.current_time.is_some_and(|last| session_time < last) {
            trace!(session_time, "Session time went backwards, clearing gap history");
            self.reset();
            self.histories.resize_with(positions.len(), GapHistory::default);
            self.current_positions.resize(positions.len(), None);
        }
        self.current_time = Some(session_time);

        for (slot, pct) in positions.iter().enumerate() {
            let pct = f64::from(*pct);
            if !pct.is_finite() || !(0.0..=1.0).contains(&pct) {
                self.current_positions[slot] = None;
                continue;
            }
            self.current_positions[slot] = Some(pct);

            let history = &mut self.histories[slot];
            let due = history
                .samples
                .back()
                .is_none_or(|last| session_time - last.time >= self.sample_interval);
            if due {
                history.push(Sample { time: session_time, position: pct }, self.capacity);
            }
        }
    }

    /// Seconds since the `ahead` car was where the `behind` car is now
    ///
    /// `None` when either car has no usable data or the `ahead` car's history
    /// does not cover the `behind` car's position.
    pub fn delta(&self, behind: usize, ahead: usize) -> Option<f64> {
        let now = self.current_time?;
        let position = self.current_positions.get(behind).copied().flatten()?;
        let passed_at = self.histories.get(ahead)?.time_at(position)?;
        Some((now - passed_at).max(0.0))
    }

    /// Track distance in metres from `behind` forward to `ahead`, within one lap
    pub fn distance(&self, behind: usize, ahead: usize) -> Option<f64> {
        let behind = self.current_positions.get(behind).copied().flatten()?;
        let ahead = self.current_positions.get(ahead).copied().flatten()?;
        Some((ahead - behind).rem_euclid(1.0) * self.track_length_m)
    }

    /// Number of samples held for a slot
    pub fn history_len(&self, slot: usize) -> usize {
        self.histories.get(slot).map_or(0, |history| history.samples.len())
    }

    pub fn reset(&mut self) {
        self.histories.clear();
        self.current_positions.clear();
        self.current_time = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn interpolates_midpoint_between_samples() {
        let mut gaps = GapEstimator::new(1000.0, 1.0, 64);
        gaps.update(0.0, &[0.0, -1.0]);
        gaps.update(10.0, &[0.1, -1.0]);
        gaps.update(12.0, &[-1.0, 0.05]);

        let delta = gaps.delta(1, 0).expect("position covered");
        assert!((delta - 7.0).abs() < 1e-6, "delta was {}", delta);
    }

    #[test]
    fn handles_lap_wraparound() {
        let mut gaps = GapEstimator::new(1000.0, 0.0, 64);
        gaps.update(0.0, &[0.9, -1.0]);
        gaps.update(2.0, &[0.1, -1.0]);
        gaps.update(3.0, &[0.2, 0.0]);

        // car 0 crossed 0.0 half way between t=0 and t=2
        let delta = gaps.delta(1, 0).unwrap();
        assert!((delta - 2.0).abs() < 1e-6, "delta was {}", delta);
    }

    #[test]
    fn small_roll_back_is_not_a_lap() {
        let mut gaps = GapEstimator::new(1000.0, 0.0, 64);
        gaps.update(0.0, &[0.1, -1.0]);
        gaps.update(10.0, &[0.3, -1.0]);
        // stationary jitter
        gaps.update(20.0, &[0.2999, -1.0]);
        gaps.update(21.0, &[-1.0, 0.2]);

        let delta = gaps.delta(1, 0).unwrap();
        assert!((delta - 16.0).abs() < 1e-4, "delta was {}", delta);

        let mut rolled = GapEstimator::new(1000.0, 0.0, 64);
        rolled.update(0.0, &[0.5, -1.0]);
        rolled.update(1.0, &[0.45, -1.0]);
        rolled.update(2.0, &[-1.0, 0.9]);
        assert_eq!(rolled.delta(1, 0), None);
    }

    #[test]
    fn uses_most_recent_passage() {
        let mut gaps = GapEstimator::new(1000.0, 0.0, 64);
        gaps.update(0.0, &[0.4, -1.0]);
        gaps.update(1.0, &[0.6, -1.0]);
        gaps.update(50.0, &[0.4, -1.0]);
        gaps.update(51.0, &[0.6, -1.0]);
        gaps.update(52.0, &[0.7, 0.5]);

        let delta = gaps.delta(1, 0).unwrap();
        assert!((delta - 1.5).abs() < 1e-6, "delta was {}", delta);
    }

    #[test]
    fn unavailable_without_history() {
        let mut gaps = GapEstimator::new(1000.0, 0.0, 64);
        assert_eq!(gaps.delta(1, 0), None);

        gaps.update(0.0, &[0.5, 0.2]);
        // a single sample cannot be interpolated
        assert_eq!(gaps.delta(1, 0), None);

        gaps.update(1.0, &[0.6, 0.25]);
        // car 0 has never been at 0.25 in its history
        assert_eq!(gaps.delta(1, 0), None);
        assert_eq!(gaps.delta(5, 0), None);
        assert_eq!(gaps.delta(1, 5), None);
    }

    #[test]
    fn respects_sample_interval_and_capacity() {
        let mut gaps = GapEstimator::new(1000.0, 0.5, 4);
        for step in 0..20 {
            gaps.update(f64::from(step) * 0.25, &[0.01 * step as f32]);
        }
        assert_eq!(gaps.history_len(0), 4);

        let mut sparse = GapEstimator::new(1000.0, 0.5, 64);
        for step in 0..8 {
            sparse.update(f64::from(step) * 0.25, &[0.01 * step as f32]);
        }
        // samples at 0.0, 0.5, 1.0, 1.5
        assert_eq!(sparse.history_len(0), 4);
    }

    #[test]
    fn backwards_time_clears_history() {
        let mut gaps = GapEstimator::new(1000.0, 0.0, 64);
        gaps.update(10.0, &[0.1]);
        gaps.update(11.0, &[0.2]);
        gaps.update(5.0, &[0.3]);
        assert_eq!(gaps.history_len(0), 1);
    }

    #[test]
    fn distance_wraps_within_a_lap() {
        let mut gaps = GapEstimator::new(2000.0, 0.0, 8);
        gaps.update(0.0, &[0.9, 0.1]);
        assert!((gaps.distance(0, 1).unwrap() - 400.0).abs() < 1e-3);
        assert!((gaps.distance(1, 0).unwrap() - 1600.0).abs() < 1e-3);
    }

    #[test]
    fn gap_display_policy() {
        assert_eq!(Gap::Reference.to_string(), "-");
        assert_eq!(Gap::from_lap_difference(1.0, Some(3.0)).to_string(), "1 L");
        assert_eq!(Gap::from_lap_difference(2.7, None).to_string(), "2 L");
        assert_eq!(Gap::from_lap_difference(0.4, Some(12.3456)).to_string(), "12.346");
        assert_eq!(Gap::from_lap_difference(0.4, None), Gap::Unavailable);
        assert_eq!(Gap::Unavailable.to_string(), "N/A");
        assert_eq!(Gap::Time(1.5).seconds(), Some(1.5));
    }

    proptest! {
        #[test]
        fn prop_delta_recovers_historical_sample_time(
            speed in 0.001f64..0.02,
            steps in 10usize..60,
            pick in 1usize..9,
        ) {
            let mut gaps = GapEstimator::new(5000.0, 0.0, 256);
            let mut history = Vec::new();
            for step in 0..steps {
                let time = step as f64;
                let position = (speed * time).rem_euclid(1.0);
                history.push((time, position));
                gaps.update(time, &[position as f32, -1.0]);
            }

            let (sample_time, sample_position) = history[steps - 1 - pick];
            let now = steps as f64;
            gaps.update(now, &[-1.0, sample_position as f32]);

            let delta = gaps.delta(1, 0);
            prop_assert!(delta.is_some());
            // f32 positions limit precision
            let tolerance = 1e-4 / speed;
            prop_assert!((delta.unwrap() - (now - sample_time)).abs() < tolerance.max(0.05));
        }

        #[test]
        fn prop_whole_lap_gaps_never_show_time(laps in 1.0f64..40.0, delta in 0.0f64..200.0) {
            let gap = Gap::from_lap_difference(laps, Some(delta));
            prop_assert!(matches!(gap, Gap::Laps(_)));
            prop_assert!(gap.to_string().ends_with(" L"));
        }
    }
}
