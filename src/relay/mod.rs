//! Duplex Relay Module
//! 
//! Handles bidirectional data relay between local stdio and the remote peer.

pub mod engine;
pub mod stats;

pub use engine::{RelayEngine, RelayOutcome, Termination};
pub use stats::{Direction, RelayStats, SessionSummary};
