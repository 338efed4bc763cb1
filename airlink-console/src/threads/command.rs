//! Command thread: drains the pending-command slot into the command channel.
//!
//! Every poll interval (50 ms by default) it takes at most one pending command
//! and performs one blocking round-trip, so there is never more than one
//! command in flight.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use airlink_io::core::types::{Method, Reply};

use crate::client::CommandClient;
use crate::shared::SharedState;

pub struct CommandThread {
    client: CommandClient,
    shared_state: Arc<SharedState>,
    poll_interval: Duration,
}

impl CommandThread {
    pub fn new(client: CommandClient, shared_state: Arc<SharedState>, poll_interval: Duration) -> Self {
        Self {
            client,
            shared_state,
            poll_interval,
        }
    }

    pub fn run(&mut self) {
        tracing::info!("Command thread started");
        let mut failing = false;

        while self.shared_state.is_running() {
            let Some(command) = self.shared_state.slot.take() else {
                std::thread::sleep(self.poll_interval);
                continue;
            };

            tracing::debug!("Sending {}", command.method);
            match self.client.request(&command) {
                Ok(reply) => {
                    failing = false;
                    self.shared_state.replies.fetch_add(1, Ordering::Relaxed);
                    log_reply(&reply);
                }
                Err(e) => {
                    if failing {
                        tracing::debug!("{} failed: {}", command.method, e);
                    } else {
                        tracing::warn!("{} failed: {}", command.method, e);
                        failing = true;
                    }
                }
            }
        }

        self.client.disconnect();
        tracing::info!("Command thread shutting down");
    }
}

/// Log the telemetry a reply carries
pub fn log_reply(reply: &Reply) {
    let baro = &reply.barometer;
    let imu = &reply.imu;
    let gps = &reply.gps;
    let mag = &reply.magnetometer;

    match reply.method {
        Method::Connect => tracing::info!("Drone connected"),
        Method::BarometerData => tracing::info!(
            "Barometer: altitude {:.2} m, pressure {:.1} Pa, qnh {:.2} hPa",
            baro.altitude,
            baro.pressure,
            baro.qnh
        ),
        Method::ImuData => tracing::info!(
            "IMU: gyro [{:.3}, {:.3}, {:.3}] rad/s, accel [{:.2}, {:.2}, {:.2}] m/s²",
            imu.angular_velocity[0],
            imu.angular_velocity[1],
            imu.angular_velocity[2],
            imu.linear_acceleration[0],
            imu.linear_acceleration[1],
            imu.linear_acceleration[2]
        ),
        Method::GpsData if !gps.is_valid => tracing::info!("GPS: no fix"),
        Method::GpsData => {}
        Method::MagnetometerData => tracing::info!(
            "Magnetometer: [{:.3}, {:.3}, {:.3}] gauss",
            mag.magnetic_field_body[0],
            mag.magnetic_field_body[1],
            mag.magnetic_field_body[2]
        ),
        method => {
            if baro.time_stamp == 0 && !gps.is_valid {
                tracing::warn!("{}: no telemetry (command failed on the drone)", method);
                return;
            }
            tracing::info!("{}: altitude {:.2} m", method, baro.altitude);
        }
    }

    if gps.is_valid && reply.method != Method::Connect {
        tracing::info!(
            "GPS: {:.6}, {:.6} alt {:.1} m, velocity [{:.2}, {:.2}, {:.2}] m/s",
            gps.latitude,
            gps.longitude,
            gps.altitude,
            gps.velocity[0],
            gps.velocity[1],
            gps.velocity[2]
        );
    }
}
