//! Error types for AirLink IO

use crate::core::wire::WireError;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// AirLink IO error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed command or reply record
    #[error("Wire error: {0}")]
    Wire(#[from] WireError),

    /// Frame length prefix exceeds the channel's limit
    #[error("Frame too large: {len} bytes (max {max})")]
    FrameTooLarge {
        /// Announced payload length
        len: usize,
        /// Channel limit
        max: usize,
    },

    /// Peer closed the connection
    #[error("Connection closed by peer")]
    Disconnected,

    /// Flight-control primitive failed
    #[error("Flight control error: {0}")]
    Flight(String),

    /// Sensor or camera not available on the device
    #[error("Component not available: {0}")]
    ComponentNotAvailable(&'static str),

    /// Unknown device type in configuration
    #[error("Unknown device type: {0}")]
    UnknownDevice(String),

    /// Configuration file could not be parsed
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    /// Configuration could not be serialized
    #[error("Config serialization error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}
