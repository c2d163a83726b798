//! Live race state for iRacing telemetry.
//!
//! Pitwall Timing turns two streams coming out of the simulator, high-rate
//! telemetry snapshots and the low-rate session info document, into the
//! state a timing screen shows: live overall and class positions, gaps to
//! the leader and to the car ahead, fastest laps and per-session results. It
//! reports changes as discrete events (session change, driver swap, new
//! leader, new fastest lap, pit stop phase).
//!
//! # Features
//!
//! - **Incremental**: every snapshot updates the state in place, missing or
//!   malformed data is skipped and picked up on a later snapshot
//! - **Gap estimation**: time gaps interpolated from per-car position history
//! - **Ordered events**: one channel per subscriber, in detection order
//! - **Async shell**: [`RaceDirector`] runs the engine from any
//!   [`SnapshotSource`] on tokio
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use pitwall_timing::{RaceEngine, SessionDocument, SessionState, TelemetrySnapshot};
//!
//! # fn main() -> pitwall_timing::Result<()> {
//! let mut engine = RaceEngine::default();
//! let mut events = engine.subscribe();
//!
//! engine.on_telemetry(TelemetrySnapshot::new(12.5, 0, SessionState::Racing, vec![0.42]));
//! engine.on_session(Arc::new(SessionDocument::parse(
//!     "WeekendInfo:\n  TrackLength: 4.01 km\nDriverInfo:\n  Drivers:\n  - CarIdx: 0\n    UserName: Alice\n    UserID: 1\n",
//! )?));
//!
//! assert_eq!(engine.drivers().len(), 1);
//! while let Ok(event) = events.try_recv() {
//!     println!("{} at {:.1}s", event.name(), event.session_time);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Running from a source
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use pitwall_timing::{ChannelSource, RaceDirector, RaceEngine};
//!
//! #[tokio::main]
//! async fn main() -> pitwall_timing::Result<()> {
//!     let (source, sender) = ChannelSource::new(64);
//!     let mut director = RaceDirector::new(RaceEngine::default());
//!     let mut events = director.events();
//!     director.start(source, 10.0)?;
//!
//!     // acquisition code pushes snapshots through `sender`
//!     sender.connected().await?;
//!
//!     while let Some(event) = events.next().await {
//!         println!("{}", event.name());
//!     }
//!     Ok(())
//! }
//! ```

mod error;
mod yaml_utils;

pub mod config;
pub mod events;
pub mod gap;
pub mod model;
pub mod ranking;
pub mod registry;
pub mod results;
pub mod session;
pub mod types;

pub mod director;
pub mod engine;
pub mod source;
pub mod sources;

#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;

// Core exports
pub use error::*;
pub use types::*;

pub use config::EngineConfig;
pub use events::{EventBus, RaceEvent, RaceEventKind};
pub use gap::{Gap, GapEstimator};
pub use model::{BestLap, Driver, EventType, PitstopPhase, SessionData, SessionResult, Track};
pub use registry::{DriverRegistry, DriverSwap};
pub use session::{Query, SessionDocument, SessionDocumentParser};

// Runtime exports
pub use director::{RaceDirector, ReaderStats};
pub use engine::{ConnectionState, RaceEngine};
pub use source::{SnapshotSource, SourceUpdate};
pub use sources::{ChannelSource, ReplaySource, SnapshotSender, YamlSessionFeed};
