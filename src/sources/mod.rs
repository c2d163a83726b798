//! Snapshot source implementations
//!
//! - [`ChannelSource`] is fed by acquisition code through a [`SnapshotSender`]
//! - [`ReplaySource`] plays back a recorded sequence of updates

mod channel;
mod replay;

pub use channel::{ChannelSource, DEFAULT_TICK_RATE_HZ, SnapshotSender, YamlSessionFeed};
pub use replay::ReplaySource;
