//! FlightControl trait definition

use crate::core::types::{
    BarometerData, CameraId, Drivetrain, GpsData, ImuData, MagnetometerData,
};
use crate::error::Result;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Yaw behaviour while translating
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YawMode {
    /// `yaw_or_rate` is a rate in deg/s, otherwise an absolute heading in deg
    pub is_rate: bool,
    pub yaw_or_rate: f32,
}

impl YawMode {
    pub fn rate(deg_per_s: f32) -> Self {
        Self {
            is_rate: true,
            yaw_or_rate: deg_per_s,
        }
    }
}

/// Flight-control backend.
///
/// Primitives mirror a multirotor SDK: motion calls start a maneuver and
/// return immediately, the caller waits for the maneuver's duration. Position
/// is NED in metres (z grows downward).
///
/// Implementations are shared as [`SharedFlight`] between the command
/// dispatcher and the video relay; every call goes through the mutex.
pub trait FlightControl: Send {
    /// Verify the backend is reachable
    fn confirm_connection(&mut self) -> Result<()>;

    fn enable_api_control(&mut self, enabled: bool) -> Result<()>;

    fn arm(&mut self, armed: bool) -> Result<()>;

    /// Climb to the backend's takeoff altitude, giving up after `timeout`
    fn takeoff(&mut self, timeout: Duration) -> Result<()>;

    fn land(&mut self) -> Result<()>;

    /// Hold the current position
    fn hover(&mut self) -> Result<()>;

    /// Current NED position (m)
    fn position(&mut self) -> Result<[f32; 3]>;

    /// Fly at horizontal velocity (vx, vy) in m/s towards altitude `z` for `duration`
    fn move_by_velocity_z(
        &mut self,
        vx: f32,
        vy: f32,
        z: f32,
        duration: Duration,
        drivetrain: Drivetrain,
        yaw: YawMode,
    ) -> Result<()>;

    /// Turn at `rate_deg` deg/s for `duration`; positive is clockwise seen from above
    fn rotate_by_yaw_rate(&mut self, rate_deg: f32, duration: Duration) -> Result<()>;

    fn barometer(&mut self) -> Result<BarometerData>;

    fn imu(&mut self) -> Result<ImuData>;

    fn gps(&mut self) -> Result<GpsData>;

    fn magnetometer(&mut self) -> Result<MagnetometerData>;

    /// Capture one compressed image from the named camera
    fn capture(&mut self, camera: CameraId) -> Result<Vec<u8>>;
}

/// Flight-control handle shared between threads
pub type SharedFlight = Arc<Mutex<Box<dyn FlightControl>>>;

/// Wrap a backend for sharing
pub fn share(flight: Box<dyn FlightControl>) -> SharedFlight {
    Arc::new(Mutex::new(flight))
}
