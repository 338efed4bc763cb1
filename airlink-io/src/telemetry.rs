//! Telemetry snapshot assembly
//!
//! Reads the four sensor sources fresh on every call and copies them into a
//! [`Reply`]. A sensor that fails to read contributes a zeroed record; the
//! snapshot itself never fails.

use crate::core::driver::{FlightControl, SharedFlight};
use crate::core::types::{Method, Reply};
use crate::error::Result;

pub struct TelemetrySnapshotBuilder {
    flight: SharedFlight,
}

impl TelemetrySnapshotBuilder {
    pub fn new(flight: SharedFlight) -> Self {
        Self { flight }
    }

    /// Reply for `method` carrying current readings
    pub fn snapshot(&self, method: Method) -> Reply {
        let mut flight = self.flight.lock();
        let f: &mut dyn FlightControl = &mut **flight;
        Reply {
            method,
            barometer: or_zeroed("barometer", f.barometer()),
            imu: or_zeroed("imu", f.imu()),
            gps: or_zeroed("gps", f.gps()),
            magnetometer: or_zeroed("magnetometer", f.magnetometer()),
        }
    }
}

fn or_zeroed<T: Default>(sensor: &str, reading: Result<T>) -> T {
    reading.unwrap_or_else(|e| {
        log::debug!("{} unavailable: {}", sensor, e);
        T::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::driver::{YawMode, share};
    use crate::core::types::{
        BarometerData, CameraId, Drivetrain, GpsData, ImuData, MagnetometerData,
    };
    use crate::error::Error;
    use std::time::Duration;

    /// Barometer and GPS work, IMU and magnetometer are unplugged
    struct HalfSensors {
        reads: u32,
    }

    impl FlightControl for HalfSensors {
        fn confirm_connection(&mut self) -> Result<()> {
            Ok(())
        }
        fn enable_api_control(&mut self, _: bool) -> Result<()> {
            Ok(())
        }
        fn arm(&mut self, _: bool) -> Result<()> {
            Ok(())
        }
        fn takeoff(&mut self, _: Duration) -> Result<()> {
            Ok(())
        }
        fn land(&mut self) -> Result<()> {
            Ok(())
        }
        fn hover(&mut self) -> Result<()> {
            Ok(())
        }
        fn position(&mut self) -> Result<[f32; 3]> {
            Ok([0.0; 3])
        }
        fn move_by_velocity_z(
            &mut self,
            _: f32,
            _: f32,
            _: f32,
            _: Duration,
            _: Drivetrain,
            _: YawMode,
        ) -> Result<()> {
            Ok(())
        }
        fn rotate_by_yaw_rate(&mut self, _: f32, _: Duration) -> Result<()> {
            Ok(())
        }
        fn barometer(&mut self) -> Result<BarometerData> {
            self.reads += 1;
            Ok(BarometerData {
                time_stamp: self.reads as u64,
                altitude: 130.0,
                pressure: 99_000.0,
                qnh: 1013.25,
            })
        }
        fn imu(&mut self) -> Result<ImuData> {
            Err(Error::ComponentNotAvailable("imu"))
        }
        fn gps(&mut self) -> Result<GpsData> {
            Ok(GpsData {
                latitude: 1.5,
                is_valid: true,
                ..GpsData::default()
            })
        }
        fn magnetometer(&mut self) -> Result<MagnetometerData> {
            Err(Error::ComponentNotAvailable("magnetometer"))
        }
        fn capture(&mut self, _: CameraId) -> Result<Vec<u8>> {
            Err(Error::ComponentNotAvailable("camera"))
        }
    }

    #[test]
    fn test_failed_sensors_are_zeroed() {
        let builder = TelemetrySnapshotBuilder::new(share(Box::new(HalfSensors { reads: 0 })));
        let reply = builder.snapshot(Method::GpsData);

        assert_eq!(reply.method, Method::GpsData);
        assert_eq!(reply.barometer.altitude, 130.0);
        assert!(reply.gps.is_valid);
        assert_eq!(reply.gps.latitude, 1.5);
        assert_eq!(reply.imu, ImuData::default());
        assert_eq!(reply.magnetometer, MagnetometerData::default());
    }

    #[test]
    fn test_every_snapshot_reads_fresh() {
        let builder = TelemetrySnapshotBuilder::new(share(Box::new(HalfSensors { reads: 0 })));
        let first = builder.snapshot(Method::BarometerData);
        let second = builder.snapshot(Method::BarometerData);
        assert_eq!(first.barometer.time_stamp, 1);
        assert_eq!(second.barometer.time_stamp, 2);
    }
}
