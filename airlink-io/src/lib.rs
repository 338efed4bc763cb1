//! AirLink IO - drone-side daemon library
//!
//! Serves operator commands over a request/response channel, executes them as
//! flight maneuvers, answers with telemetry snapshots and relays camera frames
//! to the console on an independent stream.
//!
//! The console (`airlink-console`) reuses the wire types and framing from here.

pub mod config;
pub mod core;
pub mod devices;
pub mod error;
pub mod pilot;
pub mod queue;
pub mod streaming;
pub mod telemetry;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
pub use queue::SafeQueue;
