//! Configuration for the AirLink daemon
//!
//! Loaded from a TOML file whose path is taken from `AIRLINK_CONFIG`
//! (default `airlink.toml`). A missing file means built-in defaults.
//! Network endpoints can then be overridden one by one from the environment:
//!
//! | Variable                   | Field                          |
//! |----------------------------|--------------------------------|
//! | `AIRLINK_COMMAND_ADDR`     | `network.command_address`      |
//! | `AIRLINK_VIDEO_RELAY_ADDR` | `network.video_relay_address`  |

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Environment variable naming the config file
pub const CONFIG_PATH_ENV: &str = "AIRLINK_CONFIG";
/// Config file used when `AIRLINK_CONFIG` is unset
pub const DEFAULT_CONFIG_PATH: &str = "airlink.toml";

/// Top-level daemon configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub video: VideoConfig,
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub maneuver: ManeuverConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Socket endpoints
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
    /// Bind address for the command channel (request/response)
    #[serde(default = "default_command_address")]
    pub command_address: String,

    /// Console address the video relay connects to
    #[serde(default = "default_video_relay_address")]
    pub video_relay_address: String,

    /// Maximum command frame size in bytes
    #[serde(default = "default_max_command_frame")]
    pub max_command_frame: usize,
}

fn default_command_address() -> String {
    "127.0.0.1:20001".to_string()
}

fn default_video_relay_address() -> String {
    "127.0.0.1:20002".to_string()
}

fn default_max_command_frame() -> usize {
    10 * 1024
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            command_address: default_command_address(),
            video_relay_address: default_video_relay_address(),
            max_command_frame: default_max_command_frame(),
        }
    }
}

/// Video relay cadence
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VideoConfig {
    /// Sleep between frames while streaming (ms)
    #[serde(default = "default_active_interval_ms")]
    pub active_interval_ms: u64,

    /// Sleep between polls of the enable flag while idle (ms)
    #[serde(default = "default_idle_interval_ms")]
    pub idle_interval_ms: u64,

    /// Connect timeout towards the console relay listener (ms)
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Maximum frame size in bytes
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
}

fn default_active_interval_ms() -> u64 {
    100
}

fn default_idle_interval_ms() -> u64 {
    1000
}

fn default_connect_timeout_ms() -> u64 {
    500
}

fn default_max_frame_bytes() -> usize {
    16 * 1024 * 1024
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            active_interval_ms: default_active_interval_ms(),
            idle_interval_ms: default_idle_interval_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            max_frame_bytes: default_max_frame_bytes(),
        }
    }
}

/// Flight-control device selection
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceConfig {
    /// Device type ("sim")
    #[serde(rename = "type", default = "default_device_type")]
    pub device_type: String,

    /// Human-readable name for logs
    #[serde(default = "default_device_name")]
    pub name: String,

    #[serde(default)]
    pub simulation: SimulationConfig,
}

fn default_device_type() -> String {
    "sim".to_string()
}

fn default_device_name() -> String {
    "Simulated Quadrotor".to_string()
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            device_type: default_device_type(),
            name: default_device_name(),
            simulation: SimulationConfig::default(),
        }
    }
}

/// Simulated drone parameters
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationConfig {
    /// Simulation clock multiplier (1.0 = real time)
    #[serde(default = "default_speed_factor")]
    pub speed_factor: f32,

    /// Noise seed (0 = random)
    #[serde(default)]
    pub random_seed: u64,

    /// Home position latitude (deg)
    #[serde(default = "default_home_latitude")]
    pub home_latitude: f64,

    /// Home position longitude (deg)
    #[serde(default = "default_home_longitude")]
    pub home_longitude: f64,

    /// Home position altitude above sea level (m)
    #[serde(default = "default_home_altitude")]
    pub home_altitude: f32,

    /// Altitude the takeoff primitive climbs to (m)
    #[serde(default = "default_takeoff_altitude")]
    pub takeoff_altitude: f32,

    /// Barometer altitude noise stddev (m)
    #[serde(default = "default_baro_noise")]
    pub baro_noise: f32,

    /// Gyro noise stddev (rad/s)
    #[serde(default = "default_gyro_noise")]
    pub gyro_noise: f32,

    /// Accelerometer noise stddev (m/s^2)
    #[serde(default = "default_accel_noise")]
    pub accel_noise: f32,

    /// Magnetometer noise stddev (gauss)
    #[serde(default = "default_mag_noise")]
    pub mag_noise: f32,

    /// Camera frame width (px)
    #[serde(default = "default_frame_width")]
    pub frame_width: u32,

    /// Camera frame height (px)
    #[serde(default = "default_frame_height")]
    pub frame_height: u32,
}

fn default_speed_factor() -> f32 {
    1.0
}

fn default_home_latitude() -> f64 {
    47.641468
}

fn default_home_longitude() -> f64 {
    -122.140165
}

fn default_home_altitude() -> f32 {
    122.0
}

fn default_takeoff_altitude() -> f32 {
    3.0
}

fn default_baro_noise() -> f32 {
    0.05
}

fn default_gyro_noise() -> f32 {
    0.002
}

fn default_accel_noise() -> f32 {
    0.02
}

fn default_mag_noise() -> f32 {
    0.005
}

fn default_frame_width() -> u32 {
    256
}

fn default_frame_height() -> u32 {
    144
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            speed_factor: default_speed_factor(),
            random_seed: 0,
            home_latitude: default_home_latitude(),
            home_longitude: default_home_longitude(),
            home_altitude: default_home_altitude(),
            takeoff_altitude: default_takeoff_altitude(),
            baro_noise: default_baro_noise(),
            gyro_noise: default_gyro_noise(),
            accel_noise: default_accel_noise(),
            mag_noise: default_mag_noise(),
            frame_width: default_frame_width(),
            frame_height: default_frame_height(),
        }
    }
}

/// Maneuver timing and geometry
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ManeuverConfig {
    /// Distance covered by one directional move (m)
    #[serde(default = "default_step_m")]
    pub step_m: f32,

    /// Upper bound on the takeoff primitive (s)
    #[serde(default = "default_takeoff_timeout_s")]
    pub takeoff_timeout_s: f32,

    /// Wait after takeoff before hovering (s)
    #[serde(default = "default_takeoff_settle_s")]
    pub takeoff_settle_s: f32,

    /// Yaw rate used when the command carries none (deg/s)
    #[serde(default = "default_rotate_rate_deg")]
    pub rotate_rate_deg: f32,

    /// Duration of one rotate command (s)
    #[serde(default = "default_rotate_duration_s")]
    pub rotate_duration_s: f32,

    /// Test box leg speed (m/s)
    #[serde(default = "default_box_speed")]
    pub box_speed: f32,

    /// Test box side length (m)
    #[serde(default = "default_box_size")]
    pub box_size: f32,
}

fn default_step_m() -> f32 {
    1.0
}

fn default_takeoff_timeout_s() -> f32 {
    5.0
}

fn default_takeoff_settle_s() -> f32 {
    5.0
}

fn default_rotate_rate_deg() -> f32 {
    30.0
}

fn default_rotate_duration_s() -> f32 {
    1.0
}

fn default_box_speed() -> f32 {
    3.0
}

fn default_box_size() -> f32 {
    10.0
}

impl Default for ManeuverConfig {
    fn default() -> Self {
        Self {
            step_m: default_step_m(),
            takeoff_timeout_s: default_takeoff_timeout_s(),
            takeoff_settle_s: default_takeoff_settle_s(),
            rotate_rate_deg: default_rotate_rate_deg(),
            rotate_duration_s: default_rotate_duration_s(),
            box_speed: default_box_speed(),
            box_size: default_box_size(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load from the file named by `AIRLINK_CONFIG`, falling back to defaults
    /// when that file does not exist, then apply environment overrides.
    ///
    /// Returns the config and a description of where it came from.
    pub fn from_env() -> Result<(Self, String)> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
        let (mut config, source) = if Path::new(&path).exists() {
            (Self::load(&path)?, path)
        } else {
            (Self::default(), "built-in defaults".to_string())
        };
        config.apply_env_overrides();
        Ok((config, source))
    }

    /// Override endpoints from `AIRLINK_*` environment variables
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Override endpoints through a variable lookup
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("AIRLINK_COMMAND_ADDR") {
            self.network.command_address = addr;
        }
        if let Some(addr) = lookup("AIRLINK_VIDEO_RELAY_ADDR") {
            self.network.video_relay_address = addr;
        }
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.network.command_address, "127.0.0.1:20001");
        assert_eq!(config.network.video_relay_address, "127.0.0.1:20002");
        assert_eq!(config.network.max_command_frame, 10240);
        assert_eq!(config.video.active_interval_ms, 100);
        assert_eq!(config.video.idle_interval_ms, 1000);
        assert_eq!(config.device.device_type, "sim");
        assert_eq!(config.maneuver.box_speed, 3.0);
        assert_eq!(config.maneuver.box_size, 10.0);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml_content = r#"
[network]
command_address = "0.0.0.0:30001"

[device.simulation]
speed_factor = 20.0
random_seed = 7

[logging]
level = "debug"
"#;
        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.network.command_address, "0.0.0.0:30001");
        assert_eq!(config.network.video_relay_address, "127.0.0.1:20002");
        assert_eq!(config.device.simulation.speed_factor, 20.0);
        assert_eq!(config.device.simulation.random_seed, 7);
        assert_eq!(config.device.simulation.frame_width, 256);
        assert_eq!(config.maneuver.step_m, 1.0);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [("AIRLINK_VIDEO_RELAY_ADDR", "10.0.0.5:20002")]
            .into_iter()
            .collect();
        let mut config = Config::default();
        config.apply_overrides(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.network.command_address, "127.0.0.1:20001");
        assert_eq!(config.network.video_relay_address, "10.0.0.5:20002");
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("airlink.toml");

        let mut config = Config::default();
        config.video.active_interval_ms = 40;
        config.to_file(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.video.active_interval_ms, 40);
        assert_eq!(loaded.device.name, "Simulated Quadrotor");
    }

    #[test]
    fn test_invalid_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "[network\ncommand_address = ").unwrap();
        assert!(Config::load(&path).is_err());
    }
}
