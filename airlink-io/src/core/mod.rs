//! Core abstractions shared by the daemon and the console.
//!
//! - [`driver::FlightControl`]: trait to implement for a flight-control backend
//! - [`types`]: commands, replies, telemetry records and frames
//! - [`wire`]: fixed-layout binary encoding of commands and replies

pub mod driver;
pub mod types;
pub mod wire;
