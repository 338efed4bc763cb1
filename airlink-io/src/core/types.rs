//! Core data types shared by the daemon and the console.
//!
//! - [`Command`]: one operator request, fixed layout on the wire
//! - [`Reply`]: method echo plus a telemetry snapshot, fixed layout on the wire
//! - [`Frame`]: one captured camera image with its capture time
//! - [`FlightParams`] / [`CameraRequest`]: the settings every command carries

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Command methods with their wire values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Method {
    Connect = 0,
    Arm = 1,
    Disarm = 2,
    Takeoff = 3,
    Land = 4,
    TestFlyBox = 5,
    BarometerData = 6,
    ImuData = 7,
    GpsData = 8,
    MagnetometerData = 9,
    Up = 10,
    Down = 11,
    Left = 12,
    Right = 13,
    Forward = 14,
    Back = 15,
    RotateLeft = 16,
    RotateRight = 17,
}

impl Method {
    pub const ALL: [Method; 18] = [
        Method::Connect,
        Method::Arm,
        Method::Disarm,
        Method::Takeoff,
        Method::Land,
        Method::TestFlyBox,
        Method::BarometerData,
        Method::ImuData,
        Method::GpsData,
        Method::MagnetometerData,
        Method::Up,
        Method::Down,
        Method::Left,
        Method::Right,
        Method::Forward,
        Method::Back,
        Method::RotateLeft,
        Method::RotateRight,
    ];

    pub fn from_u32(value: u32) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }

    pub fn as_u32(self) -> u32 {
        self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            Method::Connect => "connect",
            Method::Arm => "arm",
            Method::Disarm => "disarm",
            Method::Takeoff => "takeoff",
            Method::Land => "land",
            Method::TestFlyBox => "test_fly_box",
            Method::BarometerData => "barometer_data",
            Method::ImuData => "imu_data",
            Method::GpsData => "gps_data",
            Method::MagnetometerData => "magnetometer_data",
            Method::Up => "up",
            Method::Down => "down",
            Method::Left => "left",
            Method::Right => "right",
            Method::Forward => "forward",
            Method::Back => "back",
            Method::RotateLeft => "rotate_left",
            Method::RotateRight => "rotate_right",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// How the vehicle orients itself while translating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Drivetrain {
    /// Heading is independent of the direction of travel
    MaxDegreeOfFreedom = 0,
    /// Nose points along the direction of travel
    #[default]
    ForwardOnly = 1,
}

impl Drivetrain {
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(Drivetrain::MaxDegreeOfFreedom),
            1 => Some(Drivetrain::ForwardOnly),
            _ => None,
        }
    }

    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

/// Named onboard cameras
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraId {
    #[default]
    FrontCenter = 0,
    FrontRight = 1,
    FrontLeft = 2,
    BottomCenter = 3,
    BackCenter = 4,
}

impl CameraId {
    pub const ALL: [CameraId; 5] = [
        CameraId::FrontCenter,
        CameraId::FrontRight,
        CameraId::FrontLeft,
        CameraId::BottomCenter,
        CameraId::BackCenter,
    ];

    pub fn from_u32(value: u32) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }

    pub fn as_u32(self) -> u32 {
        self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            CameraId::FrontCenter => "front_center",
            CameraId::FrontRight => "front_right",
            CameraId::FrontLeft => "front_left",
            CameraId::BottomCenter => "bottom_center",
            CameraId::BackCenter => "back_center",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.name() == name)
    }
}

/// Flight settings carried by every command.
///
/// The daemon overwrites its copy on every received command, so the operator's
/// latest settings always apply to the maneuver being executed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlightParams {
    /// `yaw_or_rate` is a rate (deg/s) rather than an absolute angle (deg)
    pub yaw_is_rate: bool,
    pub yaw_or_rate: f32,
    /// Translation speed (m/s)
    pub speed: f32,
    pub drivetrain: Drivetrain,
}

impl Default for FlightParams {
    fn default() -> Self {
        Self {
            yaw_is_rate: true,
            yaw_or_rate: 0.0,
            speed: 5.0,
            drivetrain: Drivetrain::ForwardOnly,
        }
    }
}

/// Video streaming request carried by every command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CameraRequest {
    pub enabled: bool,
    pub camera: CameraId,
}

/// One operator request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Command {
    pub method: Method,
    /// Unix seconds when the command was built
    pub issued_at: u64,
    pub yaw_is_rate: bool,
    pub yaw_or_rate: f32,
    pub speed: f32,
    pub drivetrain: Drivetrain,
    pub request_camera: bool,
    pub camera: CameraId,
}

impl Command {
    /// Build a command stamped with the current time
    pub fn new(method: Method, params: &FlightParams, camera: &CameraRequest) -> Self {
        Self {
            method,
            issued_at: unix_seconds(),
            yaw_is_rate: params.yaw_is_rate,
            yaw_or_rate: params.yaw_or_rate,
            speed: params.speed,
            drivetrain: params.drivetrain,
            request_camera: camera.enabled,
            camera: camera.camera,
        }
    }

    pub fn params(&self) -> FlightParams {
        FlightParams {
            yaw_is_rate: self.yaw_is_rate,
            yaw_or_rate: self.yaw_or_rate,
            speed: self.speed,
            drivetrain: self.drivetrain,
        }
    }

    pub fn camera_request(&self) -> CameraRequest {
        CameraRequest {
            enabled: self.request_camera,
            camera: self.camera,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BarometerData {
    pub time_stamp: u64,
    /// Altitude above sea level (m)
    pub altitude: f32,
    /// Static pressure (Pa)
    pub pressure: f32,
    /// Sea-level pressure setting (hPa)
    pub qnh: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ImuData {
    pub time_stamp: u64,
    /// Body rates (rad/s)
    pub angular_velocity: [f32; 3],
    /// Specific force (m/s^2)
    pub linear_acceleration: [f32; 3],
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GpsData {
    pub time_stamp: u64,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f32,
    /// NED velocity (m/s)
    pub velocity: [f32; 3],
    /// Horizontal position error (m)
    pub eph: f32,
    /// Vertical position error (m)
    pub epv: f32,
    pub is_valid: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MagnetometerData {
    pub time_stamp: u64,
    /// Field in body axes (gauss)
    pub magnetic_field_body: [f32; 3],
}

/// Response to one command: method echo plus telemetry snapshot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reply {
    pub method: Method,
    pub barometer: BarometerData,
    pub imu: ImuData,
    pub gps: GpsData,
    pub magnetometer: MagnetometerData,
}

impl Reply {
    /// Reply with zero-filled telemetry (connect handshake, failed commands)
    pub fn empty(method: Method) -> Self {
        Self {
            method,
            barometer: BarometerData::default(),
            imu: ImuData::default(),
            gps: GpsData::default(),
            magnetometer: MagnetometerData::default(),
        }
    }
}

/// Camera frame with capture timestamp.
///
/// The payload is shared read-only between every consumer.
#[derive(Debug, Clone)]
pub struct Frame {
    pub timestamp_us: u64,
    pub data: Arc<[u8]>,
}

impl Frame {
    /// Wrap bytes captured now
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            timestamp_us: timestamp_us(),
            data: data.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Current time in microseconds since the Unix epoch
#[inline]
pub fn timestamp_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

/// Current time in seconds since the Unix epoch
#[inline]
pub fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_values_are_dense() {
        for (i, m) in Method::ALL.iter().enumerate() {
            assert_eq!(m.as_u32(), i as u32);
            assert_eq!(Method::from_u32(i as u32), Some(*m));
        }
        assert_eq!(Method::from_u32(18), None);
        assert_eq!(Method::RotateRight.as_u32(), 17);
    }

    #[test]
    fn test_camera_names() {
        for cam in CameraId::ALL {
            assert_eq!(CameraId::from_name(cam.name()), Some(cam));
        }
        assert_eq!(CameraId::from_name("top"), None);
        assert_eq!(CameraId::from_u32(3), Some(CameraId::BottomCenter));
    }

    #[test]
    fn test_command_carries_params() {
        let params = FlightParams {
            yaw_is_rate: false,
            yaw_or_rate: 90.0,
            speed: 2.5,
            drivetrain: Drivetrain::MaxDegreeOfFreedom,
        };
        let camera = CameraRequest {
            enabled: true,
            camera: CameraId::BackCenter,
        };
        let cmd = Command::new(Method::Forward, &params, &camera);
        assert_eq!(cmd.params(), params);
        assert_eq!(cmd.camera_request(), camera);
        assert!(cmd.issued_at > 0);
    }

    #[test]
    fn test_default_flight_params() {
        let params = FlightParams::default();
        assert!(params.yaw_is_rate);
        assert_eq!(params.speed, 5.0);
        assert_eq!(params.drivetrain, Drivetrain::ForwardOnly);
    }
}
