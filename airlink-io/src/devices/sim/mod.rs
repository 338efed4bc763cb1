//! Simulated multirotor for running without a flight simulator
//!
//! `SimDrone` implements [`FlightControl`] with kinematic motion, noisy
//! sensors and synthetic camera frames.
//!
//! # Configuration
//!
//! ```toml
//! [device]
//! type = "sim"
//! name = "Simulated Quadrotor"
//!
//! [device.simulation]
//! speed_factor = 1.0    # 10.0 = 10x faster maneuvers
//! random_seed = 42      # 0 = random each run
//! takeoff_altitude = 3.0
//! ```
//!
//! # Time
//!
//! There is no simulation thread. Every call advances the state by the wall
//! time elapsed since the previous call, multiplied by `speed_factor`. The
//! pilot divides its waits by the same factor, so a maneuver ends where it
//! would in real time.
//!
//! # Sensors
//!
//! | Sensor       | Model                                               |
//! |--------------|-----------------------------------------------------|
//! | Barometer    | Home altitude minus z, standard atmosphere pressure |
//! | IMU          | Yaw rate and kinematic acceleration plus gravity    |
//! | GPS          | Home position offset by NED position, valid once connected |
//! | Magnetometer | Fixed earth field rotated into the body frame       |

mod camera;
mod kinematics;
mod noise;

pub use camera::beacon_column;

use crate::config::SimulationConfig;
use crate::core::driver::{FlightControl, YawMode};
use crate::core::types::{
    BarometerData, CameraId, Drivetrain, GpsData, ImuData, MagnetometerData, timestamp_us,
};
use crate::error::{Error, Result};
use camera::CameraPose;
use kinematics::Kinematics;
use noise::SensorNoise;
use std::time::{Duration, Instant};

/// Climb and descent rate of takeoff and landing (m/s)
const VERTICAL_RATE: f32 = 1.5;
const GRAVITY: f32 = 9.80665;
const EARTH_RADIUS_M: f64 = 6_378_137.0;
const SEA_LEVEL_PRESSURE_PA: f32 = 101_325.0;
const QNH_HPA: f32 = 1013.25;
/// Earth field in NED (gauss)
const EARTH_FIELD: [f32; 3] = [0.2, 0.0, 0.45];

pub struct SimDrone {
    config: SimulationConfig,
    kinematics: Kinematics,
    noise: SensorNoise,
    last_update: Instant,
    connected: bool,
    api_control: bool,
    armed: bool,
    airborne: bool,
}

impl SimDrone {
    pub fn new(config: SimulationConfig) -> Self {
        let noise = SensorNoise::new(config.random_seed);
        Self {
            config,
            kinematics: Kinematics::new(),
            noise,
            last_update: Instant::now(),
            connected: false,
            api_control: false,
            armed: false,
            airborne: false,
        }
    }

    /// Integrate up to now
    fn advance(&mut self) {
        let now = Instant::now();
        let dt = now.duration_since(self.last_update).as_secs_f32() * self.config.speed_factor;
        self.last_update = now;
        self.kinematics.step(dt);
    }

    fn require_control(&self) -> Result<()> {
        if !self.connected {
            return Err(Error::Flight("not connected".into()));
        }
        if !self.api_control {
            return Err(Error::Flight("API control not enabled".into()));
        }
        Ok(())
    }

    fn require_airborne(&self) -> Result<()> {
        self.require_control()?;
        if !self.airborne {
            return Err(Error::Flight("vehicle is not airborne".into()));
        }
        Ok(())
    }

    fn altitude_msl(&self) -> f32 {
        self.config.home_altitude - self.kinematics.position()[2]
    }
}

impl FlightControl for SimDrone {
    fn confirm_connection(&mut self) -> Result<()> {
        self.advance();
        if !self.connected {
            log::info!("Simulated vehicle connected");
        }
        self.connected = true;
        Ok(())
    }

    fn enable_api_control(&mut self, enabled: bool) -> Result<()> {
        if !self.connected {
            return Err(Error::Flight("not connected".into()));
        }
        self.api_control = enabled;
        Ok(())
    }

    fn arm(&mut self, armed: bool) -> Result<()> {
        self.advance();
        self.require_control()?;
        if !armed && self.airborne {
            return Err(Error::Flight("cannot disarm while airborne".into()));
        }
        self.armed = armed;
        Ok(())
    }

    fn takeoff(&mut self, timeout: Duration) -> Result<()> {
        self.advance();
        self.require_control()?;
        if !self.armed {
            return Err(Error::Flight("vehicle is not armed".into()));
        }
        let target_z = -self.config.takeoff_altitude;
        let climb = target_z - self.kinematics.position()[2];
        if climb < 0.0 {
            let duration = (climb.abs() / VERTICAL_RATE).min(timeout.as_secs_f32());
            self.kinematics
                .command_velocity([0.0, 0.0, -VERTICAL_RATE], duration);
        }
        self.airborne = true;
        Ok(())
    }

    fn land(&mut self) -> Result<()> {
        self.advance();
        self.require_control()?;
        let height = -self.kinematics.position()[2];
        self.kinematics.hold();
        if height > 0.0 {
            self.kinematics
                .command_velocity([0.0, 0.0, VERTICAL_RATE], height / VERTICAL_RATE);
        }
        self.airborne = false;
        Ok(())
    }

    fn hover(&mut self) -> Result<()> {
        self.advance();
        self.require_control()?;
        if self.airborne {
            self.kinematics.hold();
        }
        Ok(())
    }

    fn position(&mut self) -> Result<[f32; 3]> {
        self.advance();
        Ok(self.kinematics.position())
    }

    fn move_by_velocity_z(
        &mut self,
        vx: f32,
        vy: f32,
        z: f32,
        duration: Duration,
        drivetrain: Drivetrain,
        yaw: YawMode,
    ) -> Result<()> {
        self.advance();
        self.require_airborne()?;
        let seconds = duration.as_secs_f32();
        if seconds <= 0.0 {
            return Ok(());
        }
        // Altitude target is reached exactly at the end of the window
        let vz = (z.min(0.0) - self.kinematics.position()[2]) / seconds;
        self.kinematics.command_velocity([vx, vy, vz], seconds);

        let horizontal = (vx * vx + vy * vy).sqrt();
        match (drivetrain, yaw.is_rate) {
            (Drivetrain::ForwardOnly, _) if horizontal > 1e-3 => {
                self.kinematics.set_yaw_deg(vy.atan2(vx).to_degrees());
            }
            (_, true) if yaw.yaw_or_rate != 0.0 => {
                self.kinematics.command_yaw_rate(yaw.yaw_or_rate, seconds);
            }
            (_, false) => self.kinematics.set_yaw_deg(yaw.yaw_or_rate),
            _ => {}
        }
        Ok(())
    }

    fn rotate_by_yaw_rate(&mut self, rate_deg: f32, duration: Duration) -> Result<()> {
        self.advance();
        self.require_airborne()?;
        self.kinematics
            .command_yaw_rate(rate_deg, duration.as_secs_f32());
        Ok(())
    }

    fn barometer(&mut self) -> Result<BarometerData> {
        self.advance();
        let altitude = self.altitude_msl() + self.noise.gaussian(self.config.baro_noise);
        let pressure = SEA_LEVEL_PRESSURE_PA * (1.0 - 2.25577e-5 * altitude).powf(5.25588);
        Ok(BarometerData {
            time_stamp: timestamp_us(),
            altitude,
            pressure,
            qnh: QNH_HPA,
        })
    }

    fn imu(&mut self) -> Result<ImuData> {
        self.advance();
        let rate = self.kinematics.yaw_rate_deg().to_radians();
        let accel_ned = self.kinematics.acceleration();
        let (sin_y, cos_y) = self.kinematics.yaw_deg().to_radians().sin_cos();
        // Specific force: kinematic acceleration minus gravity, in body axes
        let fx = accel_ned[0] * cos_y + accel_ned[1] * sin_y;
        let fy = -accel_ned[0] * sin_y + accel_ned[1] * cos_y;
        let fz = accel_ned[2] - GRAVITY;

        Ok(ImuData {
            time_stamp: timestamp_us(),
            angular_velocity: self
                .noise
                .perturb3([0.0, 0.0, rate], self.config.gyro_noise),
            linear_acceleration: self.noise.perturb3([fx, fy, fz], self.config.accel_noise),
        })
    }

    fn gps(&mut self) -> Result<GpsData> {
        self.advance();
        let [north, east, _] = self.kinematics.position();
        let lat0 = self.config.home_latitude;
        let latitude = lat0 + (north as f64 / EARTH_RADIUS_M).to_degrees();
        let longitude = self.config.home_longitude
            + (east as f64 / (EARTH_RADIUS_M * lat0.to_radians().cos())).to_degrees();

        Ok(GpsData {
            time_stamp: timestamp_us(),
            latitude,
            longitude,
            altitude: self.altitude_msl(),
            velocity: self.kinematics.velocity(),
            eph: 0.3,
            epv: 0.4,
            is_valid: self.connected,
        })
    }

    fn magnetometer(&mut self) -> Result<MagnetometerData> {
        self.advance();
        let (sin_y, cos_y) = self.kinematics.yaw_deg().to_radians().sin_cos();
        let [n, e, d] = EARTH_FIELD;
        let body = [n * cos_y + e * sin_y, -n * sin_y + e * cos_y, d];
        Ok(MagnetometerData {
            time_stamp: timestamp_us(),
            magnetic_field_body: self.noise.perturb3(body, self.config.mag_noise),
        })
    }

    fn capture(&mut self, camera: CameraId) -> Result<Vec<u8>> {
        self.advance();
        let pose = CameraPose {
            position: self.kinematics.position(),
            yaw_deg: self.kinematics.yaw_deg(),
        };
        camera::render(
            camera,
            &pose,
            self.config.frame_width,
            self.config.frame_height,
        )
    }
}
