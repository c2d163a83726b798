//! Channel-backed source that acquisition code pushes snapshots into

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, trace, warn};

use crate::session::{SessionDocument, SessionDocumentParser};
use crate::source::{SnapshotSource, SourceUpdate};
use crate::types::{TelemetrySnapshot, UpdateRate};
use crate::{Result, TelemetryError};

/// Simulator telemetry rate assumed when none is given
pub const DEFAULT_TICK_RATE_HZ: f64 = 60.0;

/// Sending half of a [`ChannelSource`]
#[derive(Debug, Clone)]
pub struct SnapshotSender {
    tx: mpsc::Sender<SourceUpdate>,
}

impl SnapshotSender {
    pub async fn send(&self, update: SourceUpdate) -> Result<()> {
        self.tx
            .send(update)
            .await
            .map_err(|_| TelemetryError::connection_failed("snapshot source was dropped"))
    }

    pub async fn connected(&self) -> Result<()> {
        self.send(SourceUpdate::Connected).await
    }

    pub async fn disconnected(&self) -> Result<()> {
        self.send(SourceUpdate::Disconnected).await
    }

    pub async fn telemetry(&self, telemetry: TelemetrySnapshot) -> Result<()> {
        self.send(SourceUpdate::Telemetry(telemetry)).await
    }

    pub async fn session(&self, document: Arc<SessionDocument>) -> Result<()> {
        self.send(SourceUpdate::Session(document)).await
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Parses raw session YAML for a [`SnapshotSender`], reusing documents for
/// versions already seen
#[derive(Debug, Default)]
pub struct YamlSessionFeed {
    parser: SessionDocumentParser,
}

impl YamlSessionFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse, validate and send the document for `version`
    pub async fn send(&mut self, sender: &SnapshotSender, yaml: &str, version: u32) -> Result<()> {
        let document = self
            .parser
            .parse_versioned(yaml, version)
            .map_err(|e| {
                warn!(version, "Malformed session document: {:#}", e);
                TelemetryError::parse("session document", format!("{:#}", e))
            })?;
        sender.session(document).await
    }

    pub fn clear(&mut self) {
        self.parser.clear_cache();
    }
}

/// Source fed through an mpsc channel
///
/// Telemetry is throttled to the configured rate with latest-wins semantics:
/// snapshots arriving before the next delivery is due replace each other and
/// only the newest is delivered. Other updates pass through immediately.
#[derive(Debug)]
pub struct ChannelSource {
    rx: mpsc::Receiver<SourceUpdate>,
    rate: UpdateRate,
    tick_rate: f64,
    next_due: Option<Instant>,
    pending: Option<TelemetrySnapshot>,
}

enum Wake {
    Due,
    Received(Option<SourceUpdate>),
}

impl ChannelSource {
    /// Create a source with room for `buffer` queued updates
    pub fn new(buffer: usize) -> (Self, SnapshotSender) {
        Self::with_tick_rate(buffer, DEFAULT_TICK_RATE_HZ)
    }

    pub fn with_tick_rate(buffer: usize, tick_rate: f64) -> (Self, SnapshotSender) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let source = Self { rx, rate: UpdateRate::Native, tick_rate, next_due: None, pending: None };
        (source, SnapshotSender { tx })
    }

    fn deliver(&mut self, telemetry: TelemetrySnapshot) -> SourceUpdate {
        self.next_due = self.rate.interval().map(|interval| Instant::now() + interval);
        SourceUpdate::Telemetry(telemetry)
    }
}

#[async_trait::async_trait]
impl SnapshotSource for ChannelSource {
    async fn next_update(&mut self) -> Result<Option<SourceUpdate>> {
        loop {
            let wake = match (self.pending.is_some(), self.next_due) {
                (true, Some(due)) => tokio::select! {
                    // a due snapshot goes out before anything newer is read
                    biased;
                    _ = sleep_until(due) => Wake::Due,
                    update = self.rx.recv() => Wake::Received(update),
                },
                _ => Wake::Received(self.rx.recv().await),
            };

            match wake {
                Wake::Due => {
                    if let Some(telemetry) = self.pending.take() {
                        return Ok(Some(self.deliver(telemetry)));
                    }
                }
                Wake::Received(None) => {
                    // flush the last throttled snapshot before ending
                    return Ok(self.pending.take().map(|telemetry| self.deliver(telemetry)));
                }
                Wake::Received(Some(SourceUpdate::Telemetry(telemetry))) => {
                    if self.next_due.is_some_and(|due| Instant::now() < due) {
                        if self.pending.replace(telemetry).is_some() {
                            trace!("Throttled telemetry snapshot replaced");
                        }
                        continue;
                    }
                    if self.pending.take().is_some() {
                        trace!("Throttled telemetry snapshot superseded");
                    }
                    return Ok(Some(self.deliver(telemetry)));
                }
                Wake::Received(Some(update)) => return Ok(Some(update)),
            }
        }
    }

    fn set_update_rate(&mut self, rate: UpdateRate) {
        self.rate = rate.normalize(self.tick_rate);
        self.next_due = None;
        debug!(rate = ?self.rate, "Channel source update rate set");
    }

    fn tick_rate(&self) -> f64 {
        self.tick_rate
    }
}
