//! Derived race state model

mod driver;
mod session_data;

pub use driver::{
    Car, Driver, DriverLive, DriverResults, PitstopPhase, SessionResult, UNKNOWN_CUSTOMER_ID,
};
pub use session_data::{BestLap, EventType, SessionData, Track};
