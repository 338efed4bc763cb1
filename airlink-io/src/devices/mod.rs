//! Flight-control backends

pub mod sim;

use crate::config::DeviceConfig;
use crate::core::driver::FlightControl;
use crate::error::{Error, Result};
use sim::SimDrone;

/// Create a flight-control backend from configuration
pub fn create_device(config: &DeviceConfig) -> Result<Box<dyn FlightControl>> {
    match config.device_type.as_str() {
        "sim" => Ok(Box::new(SimDrone::new(config.simulation.clone()))),
        _ => Err(Error::UnknownDevice(config.device_type.clone())),
    }
}
