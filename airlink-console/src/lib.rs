//! AirLink console - operator side of the AirLink link
//!
//! Sends operator commands to the drone daemon one at a time, receives the
//! drone's video relay, fans frames out to MJPEG viewers and, when a detection
//! service is available, steers the drone to keep the detected object centered.

pub mod client;
pub mod config;
pub mod correction;
pub mod detection;
pub mod error;
pub mod multiplexer;
pub mod operator;
pub mod shared;
pub mod threads;
pub mod video;

pub use config::ConsoleConfig;
pub use error::{ConsoleError, Result};
