//! Maneuver execution
//!
//! The [`Pilot`] owns the flight parameters carried by the latest command and
//! turns each [`Method`] into a sequence of flight-control primitives:
//!
//! | Method              | Primitives                                          |
//! |---------------------|-----------------------------------------------------|
//! | Connect             | confirm connection, enable API control              |
//! | Arm / Disarm        | enable API control, arm                             |
//! | Takeoff             | enable, takeoff, settle, hover                      |
//! | Land                | enable, land                                        |
//! | TestFlyBox          | enable, four velocity legs at constant altitude, hover |
//! | Up .. Back          | enable, one step by velocity, hover                 |
//! | RotateLeft/Right    | enable, yaw rate for the rotate duration, hover     |
//! | *Data queries       | nothing (reply carries telemetry)                   |
//!
//! The flight-control lock is taken per primitive call and released while the
//! pilot waits for a maneuver to finish, so the video relay keeps capturing.

use crate::config::ManeuverConfig;
use crate::core::driver::{FlightControl, SharedFlight, YawMode};
use crate::core::types::{Drivetrain, FlightParams, Method};
use crate::error::{Error, Result};
use std::thread;
use std::time::Duration;

/// Unit direction of a translation in NED axes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Direction {
    pub north: f32,
    pub east: f32,
    pub down: f32,
}

impl Direction {
    pub const FORWARD: Self = Self::new(1.0, 0.0, 0.0);
    pub const BACK: Self = Self::new(-1.0, 0.0, 0.0);
    pub const RIGHT: Self = Self::new(0.0, 1.0, 0.0);
    pub const LEFT: Self = Self::new(0.0, -1.0, 0.0);
    pub const UP: Self = Self::new(0.0, 0.0, -1.0);
    pub const DOWN: Self = Self::new(0.0, 0.0, 1.0);

    pub const fn new(north: f32, east: f32, down: f32) -> Self {
        Self { north, east, down }
    }

    /// Translation performed by a directional method
    pub fn for_method(method: Method) -> Option<Self> {
        match method {
            Method::Forward => Some(Self::FORWARD),
            Method::Back => Some(Self::BACK),
            Method::Right => Some(Self::RIGHT),
            Method::Left => Some(Self::LEFT),
            Method::Up => Some(Self::UP),
            Method::Down => Some(Self::DOWN),
            _ => None,
        }
    }
}

/// Executes maneuvers against the shared flight-control backend
pub struct Pilot {
    flight: SharedFlight,
    params: FlightParams,
    config: ManeuverConfig,
    speed_factor: f32,
}

impl Pilot {
    /// `speed_factor` shortens every wait (simulated time runs faster)
    pub fn new(flight: SharedFlight, config: ManeuverConfig, speed_factor: f32) -> Self {
        Self {
            flight,
            params: FlightParams::default(),
            config,
            speed_factor: if speed_factor > 0.0 { speed_factor } else { 1.0 },
        }
    }

    pub fn params(&self) -> &FlightParams {
        &self.params
    }

    /// Overwrite flight parameters from the latest command
    pub fn set_params(&mut self, params: FlightParams) {
        self.params = params;
    }

    /// Run the maneuver for `method`
    pub fn execute(&mut self, method: Method) -> Result<()> {
        match method {
            Method::Connect => self.connect(),
            Method::Arm => self.arm(true),
            Method::Disarm => self.arm(false),
            Method::Takeoff => self.takeoff(),
            Method::Land => self.land(),
            Method::TestFlyBox => self.test_fly_box(),
            Method::BarometerData
            | Method::ImuData
            | Method::GpsData
            | Method::MagnetometerData => Ok(()),
            Method::RotateLeft => self.rotate(-1.0),
            Method::RotateRight => self.rotate(1.0),
            Method::Up
            | Method::Down
            | Method::Left
            | Method::Right
            | Method::Forward
            | Method::Back => match Direction::for_method(method) {
                Some(direction) => self.translate(direction),
                None => Err(Error::Other(format!("{} has no direction", method))),
            },
        }
    }

    fn with_flight<R>(&self, f: impl FnOnce(&mut dyn FlightControl) -> Result<R>) -> Result<R> {
        let mut flight = self.flight.lock();
        f(&mut **flight)
    }

    /// Sleep for `seconds` of simulated time
    fn wait(&self, seconds: f32) {
        if let Ok(d) = Duration::try_from_secs_f32(seconds / self.speed_factor) {
            thread::sleep(d);
        }
    }

    fn connect(&mut self) -> Result<()> {
        self.with_flight(|f| {
            f.confirm_connection()?;
            f.enable_api_control(true)
        })
    }

    fn arm(&mut self, armed: bool) -> Result<()> {
        self.with_flight(|f| {
            f.enable_api_control(true)?;
            f.arm(armed)
        })
    }

    fn takeoff(&mut self) -> Result<()> {
        let timeout = Duration::try_from_secs_f32(self.config.takeoff_timeout_s)
            .map_err(|e| Error::Flight(format!("invalid takeoff timeout: {}", e)))?;
        self.with_flight(|f| {
            f.enable_api_control(true)?;
            f.takeoff(timeout)
        })?;
        // Explicit hover becomes the fallback once the vehicle has settled
        self.wait(self.config.takeoff_settle_s);
        self.with_flight(|f| f.hover())
    }

    fn land(&mut self) -> Result<()> {
        self.with_flight(|f| {
            f.enable_api_control(true)?;
            f.land()
        })
    }

    /// Fly a square at constant altitude, nose along each leg
    fn test_fly_box(&mut self) -> Result<()> {
        let speed = self.config.box_speed;
        let (seconds, duration) = leg_time(self.config.box_size, speed)?;
        let z = self.with_flight(|f| {
            f.enable_api_control(true)?;
            Ok(f.position()?[2])
        })?;

        let legs = [(speed, 0.0), (0.0, speed), (-speed, 0.0), (0.0, -speed)];
        for (vx, vy) in legs {
            self.with_flight(|f| {
                f.move_by_velocity_z(
                    vx,
                    vy,
                    z,
                    duration,
                    Drivetrain::ForwardOnly,
                    YawMode::rate(0.0),
                )
            })?;
            self.wait(seconds);
        }
        self.with_flight(|f| f.hover())
    }

    /// Move one step along `direction` at the commanded speed, then hover
    pub fn translate(&mut self, direction: Direction) -> Result<()> {
        let params = self.params;
        let step = self.config.step_m;
        let (seconds, duration) = leg_time(step, params.speed)?;
        let yaw = YawMode {
            is_rate: params.yaw_is_rate,
            yaw_or_rate: params.yaw_or_rate,
        };

        self.with_flight(|f| {
            f.enable_api_control(true)?;
            let z = f.position()?[2];
            f.move_by_velocity_z(
                direction.north * params.speed,
                direction.east * params.speed,
                z + direction.down * step,
                duration,
                params.drivetrain,
                yaw,
            )
        })?;
        self.wait(seconds);
        self.with_flight(|f| f.hover())
    }

    /// Turn for the rotate duration. `sign` is -1 for left (counter-clockwise).
    fn rotate(&mut self, sign: f32) -> Result<()> {
        let rate = if self.params.yaw_is_rate && self.params.yaw_or_rate != 0.0 {
            self.params.yaw_or_rate.abs()
        } else {
            self.config.rotate_rate_deg
        };
        let seconds = self.config.rotate_duration_s;
        let duration = Duration::try_from_secs_f32(seconds)
            .map_err(|e| Error::Flight(format!("invalid rotate duration: {}", e)))?;

        self.with_flight(|f| {
            f.enable_api_control(true)?;
            f.rotate_by_yaw_rate(sign * rate, duration)
        })?;
        self.wait(seconds);
        self.with_flight(|f| f.hover())
    }
}

/// Time to cover `distance` at `speed`
fn leg_time(distance: f32, speed: f32) -> Result<(f32, Duration)> {
    if !(speed > 0.0 && speed.is_finite()) {
        return Err(Error::Flight(format!("invalid speed {}", speed)));
    }
    let seconds = distance / speed;
    let duration = Duration::try_from_secs_f32(seconds)
        .map_err(|_| Error::Flight(format!("invalid maneuver length {}", distance)))?;
    Ok((seconds, duration))
}
