//! Runtime shell that drives a [`RaceEngine`] from a snapshot source
//!
//! [`RaceDirector::start`] spawns a reader task that owns the source. Telemetry
//! is applied on the reader task; session documents are applied on a
//! short-lived blocking task so that a reconciliation pass never stalls the
//! telemetry stream. While a session pass holds the engine, telemetry ticks
//! are skipped rather than queued.

use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

use crate::config::EngineConfig;
use crate::engine::RaceEngine;
use crate::events::RaceEvent;
use crate::source::{SnapshotSource, SourceUpdate};
use crate::types::{DEFAULT_UPDATE_FREQUENCY_HZ, UpdateRate};
use crate::Result;

/// Consecutive source errors tolerated before the reader gives up
const MAX_ERRORS: u32 = 10;

/// Counters reported by a finished reader task
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReaderStats {
    /// Telemetry snapshots applied to the engine
    pub telemetry: u64,
    /// Telemetry snapshots dropped because a session pass held the engine
    pub skipped_telemetry: u64,
    pub sessions: u64,
    pub errors: u64,
}

/// Owns a [`RaceEngine`] and feeds it from a [`SnapshotSource`]
pub struct RaceDirector {
    engine: Arc<Mutex<RaceEngine>>,
    cancel: Option<CancellationToken>,
    task: Option<JoinHandle<ReaderStats>>,
}

impl RaceDirector {
    pub fn new(engine: RaceEngine) -> Self {
        Self { engine: Arc::new(Mutex::new(engine)), cancel: None, task: None }
    }

    pub fn with_config(config: EngineConfig) -> Result<Self> {
        Ok(Self::new(RaceEngine::new(config)?))
    }

    /// Shared handle to the engine
    pub fn engine(&self) -> Arc<Mutex<RaceEngine>> {
        Arc::clone(&self.engine)
    }

    /// Read engine state under the lock
    pub fn read<R>(&self, f: impl FnOnce(&RaceEngine) -> R) -> R {
        f(&lock(&self.engine))
    }

    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<RaceEvent> {
        lock(&self.engine).subscribe()
    }

    /// Events as a stream
    pub fn events(&self) -> UnboundedReceiverStream<RaceEvent> {
        UnboundedReceiverStream::new(self.subscribe())
    }

    /// Start reading from `source` at [`DEFAULT_UPDATE_FREQUENCY_HZ`]
    pub fn start_default<S>(&mut self, source: S) -> Result<()>
    where
        S: SnapshotSource,
    {
        self.start(source, DEFAULT_UPDATE_FREQUENCY_HZ)
    }

    /// Start reading from `source`, delivering telemetry at most
    /// `update_frequency_hz` times per second
    ///
    /// Any previous run is stopped first. Must be called from within a tokio
    /// runtime. [`start_default`](Self::start_default) uses
    /// [`DEFAULT_UPDATE_FREQUENCY_HZ`].
    pub fn start<S>(&mut self, mut source: S, update_frequency_hz: f64) -> Result<()>
    where
        S: SnapshotSource,
    {
        let rate = UpdateRate::from_hz(update_frequency_hz)?;
        self.stop();

        source.set_update_rate(rate);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(reader_task(source, Arc::clone(&self.engine), cancel.clone()));

        info!(update_frequency_hz, "Race director started");
        self.cancel = Some(cancel);
        self.task = Some(task);
        Ok(())
    }

    /// Stop the reader task. Snapshots already applied stay in the engine.
    pub fn stop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
            info!("Race director stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Wait for the reader task to finish and return its counters
    pub async fn wait(&mut self) -> Option<ReaderStats> {
        let task = self.task.take()?;
        match task.await {
            Ok(stats) => Some(stats),
            Err(e) => {
                error!("Reader task failed: {}", e);
                None
            }
        }
    }
}

impl Drop for RaceDirector {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
    }
}

fn lock(engine: &Mutex<RaceEngine>) -> MutexGuard<'_, RaceEngine> {
    // a panicked handler leaves the engine usable
    engine.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

async fn finish_session_pass(task: &mut Option<JoinHandle<()>>) {
    if let Some(task) = task.take() {
        if let Err(e) = task.await {
            error!("Session pass failed: {}", e);
        }
    }
}

/// Reader task - owns the source and applies updates to the engine
async fn reader_task<S>(
    mut source: S,
    engine: Arc<Mutex<RaceEngine>>,
    cancel: CancellationToken,
) -> ReaderStats
where
    S: SnapshotSource,
{
    info!("Snapshot reader task started");
    let mut stats = ReaderStats::default();
    let mut error_count = 0u32;
    let mut session_pass: Option<JoinHandle<()>> = None;

    loop {
        if cancel.is_cancelled() {
            info!("Snapshot reader cancelled");
            break;
        }

        let result = tokio::select! {
            _ = cancel.cancelled() => {
                info!("Snapshot reader cancelled during read");
                break;
            }
            result = source.next_update() => result,
        };

        match result {
            Ok(Some(SourceUpdate::Telemetry(telemetry))) => {
                error_count = 0;
                match engine.try_lock() {
                    Ok(mut engine) => {
                        engine.on_telemetry(telemetry);
                        stats.telemetry += 1;
                    }
                    Err(TryLockError::WouldBlock) => {
                        trace!(session_time = telemetry.session_time, "Engine busy, skipping telemetry");
                        stats.skipped_telemetry += 1;
                    }
                    Err(TryLockError::Poisoned(poisoned)) => {
                        poisoned.into_inner().on_telemetry(telemetry);
                        stats.telemetry += 1;
                    }
                }
            }
            Ok(Some(SourceUpdate::Session(document))) => {
                error_count = 0;
                // passes apply in arrival order
                finish_session_pass(&mut session_pass).await;
                debug!(version = document.version(), "Applying session document");
                stats.sessions += 1;
                let engine = Arc::clone(&engine);
                session_pass =
                    Some(tokio::task::spawn_blocking(move || lock(&engine).on_session(document)));
            }
            Ok(Some(update)) => {
                error_count = 0;
                finish_session_pass(&mut session_pass).await;
                let mut engine = lock(&engine);
                match update {
                    SourceUpdate::Connected => engine.on_connected(),
                    SourceUpdate::Disconnected => engine.on_disconnected(),
                    SourceUpdate::Telemetry(_) | SourceUpdate::Session(_) => {}
                }
            }
            Ok(None) => {
                info!("Snapshot source ended");
                break;
            }
            Err(e) => {
                // Source error - don't give up on transient failures
                error_count += 1;
                stats.errors += 1;
                error!("Source error ({}/{}): {}", error_count, MAX_ERRORS, e);

                if error_count >= MAX_ERRORS {
                    error!("Too many source errors, shutting down");
                    finish_session_pass(&mut session_pass).await;
                    lock(&engine).on_disconnected();
                    break;
                }

                // Exponential backoff: 100ms, 200ms, 400ms, ... capped at 1.6s
                let backoff = std::time::Duration::from_millis(50 * (1 << error_count.min(5)));
                tokio::time::sleep(backoff).await;
            }
        }
    }

    finish_session_pass(&mut session_pass).await;
    info!(
        telemetry = stats.telemetry,
        skipped = stats.skipped_telemetry,
        sessions = stats.sessions,
        "Snapshot reader task ended"
    );
    stats
}
