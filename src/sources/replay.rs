//! Replay of a recorded update sequence

use std::collections::VecDeque;
use tokio::time::{Interval, MissedTickBehavior, interval};
use tracing::{debug, trace};

use crate::Result;
use crate::source::{SnapshotSource, SourceUpdate};
use crate::types::UpdateRate;

/// Source that plays back recorded updates in order
///
/// Telemetry recorded at `tick_rate` is decimated to the configured update
/// rate. With pacing enabled, delivered snapshots are spaced in real time
/// at that rate; otherwise the recording is played as fast as it is read.
#[derive(Debug)]
pub struct ReplaySource {
    updates: VecDeque<SourceUpdate>,
    tick_rate: f64,
    stride: u64,
    telemetry_seen: u64,
    paced: bool,
    pacing: Option<Interval>,
}

impl ReplaySource {
    pub fn new(updates: impl IntoIterator<Item = SourceUpdate>, tick_rate: f64) -> Self {
        let updates: VecDeque<_> = updates.into_iter().collect();
        debug!(updates = updates.len(), tick_rate, "Replay loaded");
        Self { updates, tick_rate, stride: 1, telemetry_seen: 0, paced: false, pacing: None }
    }

    /// Space telemetry in real time at the update rate
    pub fn paced(mut self, paced: bool) -> Self {
        self.paced = paced;
        self
    }

    pub fn remaining(&self) -> usize {
        self.updates.len()
    }
}

#[async_trait::async_trait]
impl SnapshotSource for ReplaySource {
    async fn next_update(&mut self) -> Result<Option<SourceUpdate>> {
        while let Some(update) = self.updates.pop_front() {
            if !matches!(update, SourceUpdate::Telemetry(_)) {
                return Ok(Some(update));
            }

            self.telemetry_seen += 1;
            if (self.telemetry_seen - 1) % self.stride != 0 {
                trace!(frame = self.telemetry_seen, "Skipping replay frame");
                continue;
            }
            if let Some(pacing) = self.pacing.as_mut() {
                pacing.tick().await;
            }
            return Ok(Some(update));
        }
        debug!(frames = self.telemetry_seen, "Reached end of replay");
        Ok(None)
    }

    fn set_update_rate(&mut self, rate: UpdateRate) {
        let rate = rate.normalize(self.tick_rate);
        let hz = rate.hz_or(self.tick_rate);
        self.stride = (self.tick_rate / hz).round().max(1.0) as u64;
        self.pacing = match UpdateRate::Max(hz).interval() {
            Some(period) if self.paced => {
                let mut pacing = interval(period);
                pacing.set_missed_tick_behavior(MissedTickBehavior::Delay);
                Some(pacing)
            }
            _ => None,
        };
        debug!(stride = self.stride, paced = self.pacing.is_some(), "Replay update rate set");
    }

    fn tick_rate(&self) -> f64 {
        self.tick_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::race_telemetry;
    use std::time::Duration;

    fn recording(frames: usize) -> Vec<SourceUpdate> {
        let mut updates = vec![SourceUpdate::Connected];
        updates.extend(
            (0..frames).map(|i| SourceUpdate::Telemetry(race_telemetry(i as f64 / 60.0, 0, &[0.0], &[]))),
        );
        updates.push(SourceUpdate::Disconnected);
        updates
    }

    async fn collect(source: &mut ReplaySource) -> Vec<SourceUpdate> {
        let mut out = Vec::new();
        while let Some(update) = source.next_update().await.unwrap() {
            out.push(update);
        }
        out
    }

    #[tokio::test]
    async fn native_rate_replays_every_frame() {
        let mut source = ReplaySource::new(recording(12), 60.0);
        let updates = collect(&mut source).await;
        assert_eq!(updates.len(), 14);
        assert_eq!(updates[0].kind(), "connected");
        assert_eq!(updates[13].kind(), "disconnected");
    }

    #[tokio::test]
    async fn lower_rate_decimates_telemetry_only() {
        let mut source = ReplaySource::new(recording(12), 60.0);
        source.set_update_rate(UpdateRate::from_hz(10.0).unwrap());
        let updates = collect(&mut source).await;

        let telemetry = updates.iter().filter(|u| u.kind() == "telemetry").count();
        assert_eq!(telemetry, 2);
        assert_eq!(updates.first().map(SourceUpdate::kind), Some("connected"));
        assert_eq!(updates.last().map(SourceUpdate::kind), Some("disconnected"));
        assert_eq!(source.remaining(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn paced_replay_spaces_frames() {
        let mut source = ReplaySource::new(recording(3), 60.0).paced(true);
        source.set_update_rate(UpdateRate::from_hz(20.0).unwrap());

        let start = tokio::time::Instant::now();
        collect(&mut source).await;
        // stride 3 leaves a single frame, delivered on the immediate first tick
        assert!(start.elapsed() < Duration::from_millis(100));

        let mut source = ReplaySource::new(recording(9), 60.0).paced(true);
        source.set_update_rate(UpdateRate::from_hz(20.0).unwrap());
        let start = tokio::time::Instant::now();
        collect(&mut source).await;
        // three frames at 50ms spacing
        assert!(start.elapsed() >= Duration::from_millis(100));
    }
}
