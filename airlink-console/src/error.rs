//! Error types for the AirLink console

use thiserror::Error;

/// Console error type
#[derive(Error, Debug)]
pub enum ConsoleError {
    #[error("Connection failed: {0}")]
    Connection(#[from] std::io::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Detection error: {0}")]
    Detection(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Thread error: {0}")]
    Thread(String),
}

impl From<airlink_io::Error> for ConsoleError {
    fn from(e: airlink_io::Error) -> Self {
        match e {
            airlink_io::Error::Io(io) => ConsoleError::Connection(io),
            other => ConsoleError::Protocol(other.to_string()),
        }
    }
}

impl From<airlink_io::core::wire::WireError> for ConsoleError {
    fn from(e: airlink_io::core::wire::WireError) -> Self {
        ConsoleError::Protocol(e.to_string())
    }
}

impl From<serde_json::Error> for ConsoleError {
    fn from(e: serde_json::Error) -> Self {
        ConsoleError::Detection(format!("Invalid result JSON: {}", e))
    }
}

impl From<toml::de::Error> for ConsoleError {
    fn from(e: toml::de::Error) -> Self {
        ConsoleError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ConsoleError>;
