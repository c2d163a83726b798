//! # Session Documents
//!
//! The simulator's session info is a hierarchical YAML document: the entrant
//! roster (`DriverInfo.Drivers`), per-session result tables
//! (`SessionInfo.Sessions[SessionNum=n].ResultsPositions`), the qualifying
//! table (`QualifyResultsInfo.Results`) and static track data
//! (`WeekendInfo`).
//!
//! ```text
//! raw YAML ──► preprocess ──► SessionDocument ──► Query (path / find / try_get)
//!                                   │
//!                     SessionDocumentParser (version cache)
//! ```

pub mod document;
pub mod parser;

pub use document::{Query, SessionDocument};
pub use parser::{SessionDocumentCache, SessionDocumentParser};
