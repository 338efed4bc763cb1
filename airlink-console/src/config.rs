//! Configuration loading for the AirLink console
//!
//! The file path comes from `AIRLINK_CONSOLE_CONFIG` (default `console.toml`);
//! a missing file means built-in defaults. Endpoints can be overridden from the
//! environment afterwards:
//!
//! | Variable                   | Field                         |
//! |----------------------------|-------------------------------|
//! | `AIRLINK_COMMAND_ADDR`     | `connection.command_address`  |
//! | `AIRLINK_VIDEO_RELAY_ADDR` | `video.relay_listen`          |
//! | `AIRLINK_VIEWER_PORT`      | `video.viewer_port`           |
//! | `AIRLINK_DETECTION_ADDR`   | `detection.address`           |

use crate::correction::CorrectionConfig;
use crate::error::{ConsoleError, Result};
use airlink_io::core::types::{CameraId, CameraRequest, Drivetrain, FlightParams};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Environment variable naming the config file
pub const CONFIG_PATH_ENV: &str = "AIRLINK_CONSOLE_CONFIG";
/// Config file used when `AIRLINK_CONSOLE_CONFIG` is unset
pub const DEFAULT_CONFIG_PATH: &str = "console.toml";

/// Main configuration structure
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ConsoleConfig {
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub video: VideoConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub correction: CorrectionConfig,
    #[serde(default)]
    pub operator: OperatorConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Command channel client settings
#[derive(Clone, Debug, Deserialize)]
pub struct ConnectionConfig {
    /// Daemon command endpoint (default: 127.0.0.1:20001)
    #[serde(default = "default_command_address")]
    pub command_address: String,

    /// Connect timeout in milliseconds (default: 2000)
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,

    /// Reply timeout in milliseconds (default: 5000)
    #[serde(default = "default_reply_timeout")]
    pub reply_timeout_ms: u64,

    /// Reply timeout for takeoff, land and the box flight in milliseconds (default: 60000)
    #[serde(default = "default_maneuver_timeout")]
    pub maneuver_timeout_ms: u64,

    /// Pending-command poll interval in milliseconds (default: 50)
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            command_address: default_command_address(),
            connect_timeout_ms: default_connect_timeout(),
            reply_timeout_ms: default_reply_timeout(),
            maneuver_timeout_ms: default_maneuver_timeout(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

/// Video relay listener and viewer fan-out
#[derive(Clone, Debug, Deserialize)]
pub struct VideoConfig {
    /// Address the drone's video relay connects to (default: 127.0.0.1:20002)
    #[serde(default = "default_relay_listen")]
    pub relay_listen: String,

    /// Relay read timeout in milliseconds (default: 100)
    #[serde(default = "default_relay_read_timeout")]
    pub relay_read_timeout_ms: u64,

    /// Largest accepted relay frame in bytes (default: 16 MiB)
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,

    /// Viewer listener host (default: 0.0.0.0)
    #[serde(default = "default_viewer_host")]
    pub viewer_host: String,

    /// Viewer listener port (default: 8000)
    #[serde(default = "default_viewer_port")]
    pub viewer_port: u16,

    /// Multipart boundary token
    #[serde(default = "default_boundary")]
    pub boundary: String,

    /// Per-viewer write timeout in milliseconds (default: 200)
    #[serde(default = "default_viewer_write_timeout")]
    pub viewer_write_timeout_ms: u64,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            relay_listen: default_relay_listen(),
            relay_read_timeout_ms: default_relay_read_timeout(),
            max_frame_bytes: default_max_frame_bytes(),
            viewer_host: default_viewer_host(),
            viewer_port: default_viewer_port(),
            boundary: default_boundary(),
            viewer_write_timeout_ms: default_viewer_write_timeout(),
        }
    }
}

/// External detection service
#[derive(Clone, Debug, Deserialize)]
pub struct DetectionConfig {
    /// Run the detection loop at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Detection service endpoint (default: 127.0.0.1:20003)
    #[serde(default = "default_detection_address")]
    pub address: String,

    /// Connect timeout in milliseconds (default: 1000)
    #[serde(default = "default_detection_connect_timeout")]
    pub connect_timeout_ms: u64,

    /// Read/write timeout per round-trip in milliseconds (default: 2000)
    #[serde(default = "default_detection_io_timeout")]
    pub io_timeout_ms: u64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            address: default_detection_address(),
            connect_timeout_ms: default_detection_connect_timeout(),
            io_timeout_ms: default_detection_io_timeout(),
        }
    }
}

/// Initial operator settings
#[derive(Clone, Debug, Deserialize)]
pub struct OperatorConfig {
    /// Translation speed in m/s (default: 5.0)
    #[serde(default = "default_speed")]
    pub speed: f32,

    /// Interpret `yaw_or_rate` as a rate in deg/s (default: true)
    #[serde(default = "default_true")]
    pub yaw_is_rate: bool,

    #[serde(default)]
    pub yaw_or_rate: f32,

    #[serde(default)]
    pub drivetrain: Drivetrain,

    #[serde(default)]
    pub camera: CameraId,

    /// Ask the drone to stream from the first command on (default: false)
    #[serde(default)]
    pub stream_on_start: bool,

    /// Read operator commands from stdin (default: true)
    #[serde(default = "default_true")]
    pub stdin: bool,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            speed: default_speed(),
            yaw_is_rate: true,
            yaw_or_rate: 0.0,
            drivetrain: Drivetrain::default(),
            camera: CameraId::default(),
            stream_on_start: false,
            stdin: true,
        }
    }
}

impl OperatorConfig {
    pub fn flight_params(&self) -> FlightParams {
        FlightParams {
            yaw_is_rate: self.yaw_is_rate,
            yaw_or_rate: self.yaw_or_rate,
            speed: self.speed,
            drivetrain: self.drivetrain,
        }
    }

    pub fn camera_request(&self) -> CameraRequest {
        CameraRequest {
            enabled: self.stream_on_start,
            camera: self.camera,
        }
    }
}

/// Logging settings
#[derive(Clone, Debug, Deserialize)]
pub struct LoggingConfig {
    /// Level for the `airlink_console` directive (default: info)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_command_address() -> String {
    "127.0.0.1:20001".to_string()
}
fn default_connect_timeout() -> u64 {
    2000
}
fn default_reply_timeout() -> u64 {
    5000
}
fn default_maneuver_timeout() -> u64 {
    60_000
}
fn default_poll_interval() -> u64 {
    50
}
fn default_relay_listen() -> String {
    "127.0.0.1:20002".to_string()
}
fn default_relay_read_timeout() -> u64 {
    100
}
fn default_max_frame_bytes() -> usize {
    16 * 1024 * 1024
}
fn default_viewer_host() -> String {
    "0.0.0.0".to_string()
}
fn default_viewer_port() -> u16 {
    8000
}
fn default_boundary() -> String {
    "airlinkMjpegBoundary7f3c9a1e".to_string()
}
fn default_viewer_write_timeout() -> u64 {
    200
}
fn default_detection_address() -> String {
    "127.0.0.1:20003".to_string()
}
fn default_detection_connect_timeout() -> u64 {
    1000
}
fn default_detection_io_timeout() -> u64 {
    2000
}
fn default_speed() -> f32 {
    5.0
}
fn default_true() -> bool {
    true
}
fn default_log_level() -> String {
    "info".to_string()
}

impl ConsoleConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConsoleError::Config(format!("Failed to read {:?}: {}", path, e)))?;
        let config: ConsoleConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load from `AIRLINK_CONSOLE_CONFIG` (or `console.toml`), falling back to
    /// defaults when the file is absent, then apply environment overrides.
    ///
    /// Returns the config and where it came from.
    pub fn from_env() -> Result<(Self, String)> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
        let (mut config, source) = if Path::new(&path).exists() {
            (Self::load(Path::new(&path))?, path)
        } else {
            (Self::default(), "built-in defaults".to_string())
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok((config, source))
    }

    /// Override endpoints through a variable lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("AIRLINK_COMMAND_ADDR") {
            self.connection.command_address = addr;
        }
        if let Some(addr) = lookup("AIRLINK_VIDEO_RELAY_ADDR") {
            self.video.relay_listen = addr;
        }
        if let Some(port) = lookup("AIRLINK_VIEWER_PORT") {
            self.video.viewer_port = port
                .trim()
                .parse()
                .map_err(|e| ConsoleError::Config(format!("Invalid AIRLINK_VIEWER_PORT {:?}: {}", port, e)))?;
        }
        if let Some(addr) = lookup("AIRLINK_DETECTION_ADDR") {
            self.detection.address = addr;
        }
        Ok(())
    }

    /// Viewer listener address
    pub fn viewer_address(&self) -> String {
        format!("{}:{}", self.video.viewer_host, self.video.viewer_port)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.connection.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = ConsoleConfig::default();
        assert_eq!(config.connection.command_address, "127.0.0.1:20001");
        assert_eq!(config.connection.reply_timeout_ms, 5000);
        assert_eq!(config.connection.poll_interval_ms, 50);
        assert_eq!(config.video.relay_listen, "127.0.0.1:20002");
        assert_eq!(config.viewer_address(), "0.0.0.0:8000");
        assert_eq!(config.video.boundary, "airlinkMjpegBoundary7f3c9a1e");
        assert_eq!(config.video.viewer_write_timeout_ms, 200);
        assert_eq!(config.correction.yaw_deadband_px, 40.0);
        assert_eq!(config.correction.alt_deadband_px, 20.0);
        assert_eq!(config.operator.flight_params(), FlightParams::default());
        assert!(!config.operator.camera_request().enabled);
    }

    #[test]
    fn test_partial_toml() {
        let toml_content = r#"
[video]
viewer_port = 8080

[correction]
yaw_deadband_px = 60.0

[operator]
speed = 2.5
drivetrain = "max_degree_of_freedom"
camera = "bottom_center"
stream_on_start = true
"#;
        let config: ConsoleConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.video.viewer_port, 8080);
        assert_eq!(config.video.relay_listen, "127.0.0.1:20002");
        assert_eq!(config.correction.yaw_deadband_px, 60.0);
        assert_eq!(config.correction.alt_deadband_px, 20.0);

        let params = config.operator.flight_params();
        assert_eq!(params.speed, 2.5);
        assert_eq!(params.drivetrain, Drivetrain::MaxDegreeOfFreedom);
        let camera = config.operator.camera_request();
        assert!(camera.enabled);
        assert_eq!(camera.camera, CameraId::BottomCenter);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("AIRLINK_COMMAND_ADDR", "10.0.0.2:20001"),
            ("AIRLINK_VIEWER_PORT", "9090"),
            ("AIRLINK_DETECTION_ADDR", "10.0.0.3:7000"),
        ]
        .into_iter()
        .collect();
        let mut config = ConsoleConfig::default();
        config
            .apply_overrides(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.connection.command_address, "10.0.0.2:20001");
        assert_eq!(config.video.viewer_port, 9090);
        assert_eq!(config.video.relay_listen, "127.0.0.1:20002");
        assert_eq!(config.detection.address, "10.0.0.3:7000");
    }

    #[test]
    fn test_bad_viewer_port_override() {
        let mut config = ConsoleConfig::default();
        let result = config.apply_overrides(|k| (k == "AIRLINK_VIEWER_PORT").then(|| "http".to_string()));
        assert!(matches!(result, Err(ConsoleError::Config(_))));
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("console.toml");
        std::fs::write(&path, "[detection]\nenabled = false\n").unwrap();
        let config = ConsoleConfig::load(&path).unwrap();
        assert!(!config.detection.enabled);
        assert_eq!(config.detection.address, "127.0.0.1:20003");

        std::fs::write(&path, "[detection\n").unwrap();
        assert!(ConsoleConfig::load(&path).is_err());
    }
}
