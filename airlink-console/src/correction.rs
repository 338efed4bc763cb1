//! Visual correction policy.
//!
//! Maps the offset between the detected object and the image center onto the
//! next drone command. Yaw takes priority over altitude:
//!
//! ```text
//! dx = center.x - object.x      dy = center.y - object.y
//!
//! |dx| > yaw deadband   → rotate toward the object (left when dx > 0)
//!                         high rate when |dx| > 3 × deadband, else low rate
//! |dy| > alt deadband   → climb when dy > 0 (object above center), else descend
//! otherwise             → centered, no command
//! ```
//!
//! Pixel rows grow downward, so an object above center has a smaller y.

use airlink_io::core::types::{CameraRequest, Command, FlightParams, Method};
use serde::Deserialize;

/// Pixel coordinates in the analysed image
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct PixelPoint {
    pub x: f32,
    pub y: f32,
}

impl PixelPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Correction thresholds, fixed after startup
#[derive(Clone, Debug, Deserialize)]
pub struct CorrectionConfig {
    /// Submit corrections at all (default: true)
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Horizontal offset tolerated before yawing (default: 40 px)
    #[serde(default = "default_yaw_deadband")]
    pub yaw_deadband_px: f32,

    /// Vertical offset tolerated before climbing or descending (default: 20 px)
    #[serde(default = "default_alt_deadband")]
    pub alt_deadband_px: f32,

    /// Yaw rate for large offsets in deg/s (default: 10)
    #[serde(default = "default_high_rate")]
    pub high_yaw_rate: f32,

    /// Yaw rate for small offsets in deg/s (default: 4)
    #[serde(default = "default_low_rate")]
    pub low_yaw_rate: f32,

    /// Multiple of the yaw deadband above which the high rate applies (default: 3)
    #[serde(default = "default_high_rate_factor")]
    pub high_rate_factor: f32,
}

fn default_enabled() -> bool {
    true
}
fn default_yaw_deadband() -> f32 {
    40.0
}
fn default_alt_deadband() -> f32 {
    20.0
}
fn default_high_rate() -> f32 {
    10.0
}
fn default_low_rate() -> f32 {
    4.0
}
fn default_high_rate_factor() -> f32 {
    3.0
}

impl Default for CorrectionConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            yaw_deadband_px: default_yaw_deadband(),
            alt_deadband_px: default_alt_deadband(),
            high_yaw_rate: default_high_rate(),
            low_yaw_rate: default_low_rate(),
            high_rate_factor: default_high_rate_factor(),
        }
    }
}

/// One corrective action
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Correction {
    /// Yaw at `rate` deg/s toward the object
    RotateLeft { rate: f32 },
    RotateRight { rate: f32 },
    Up,
    Down,
}

impl Correction {
    pub fn method(&self) -> Method {
        match self {
            Correction::RotateLeft { .. } => Method::RotateLeft,
            Correction::RotateRight { .. } => Method::RotateRight,
            Correction::Up => Method::Up,
            Correction::Down => Method::Down,
        }
    }

    /// Build the full command, starting from the operator's current settings.
    ///
    /// Yaw corrections switch to rate mode at the chosen rate; altitude
    /// corrections leave the yaw settings alone.
    pub fn to_command(&self, params: &FlightParams, camera: &CameraRequest) -> Command {
        let mut params = *params;
        if let Correction::RotateLeft { rate } | Correction::RotateRight { rate } = *self {
            params.yaw_is_rate = true;
            params.yaw_or_rate = rate;
        }
        Command::new(self.method(), &params, camera)
    }
}

impl CorrectionConfig {
    /// Decide the next correction, `None` when the object is centered
    pub fn decide(&self, object: PixelPoint, center: PixelPoint) -> Option<Correction> {
        let dx = center.x - object.x;
        let dy = center.y - object.y;

        if dx.abs() > self.yaw_deadband_px {
            let rate = if dx.abs() > self.high_rate_factor * self.yaw_deadband_px {
                self.high_yaw_rate
            } else {
                self.low_yaw_rate
            };
            return Some(if dx > 0.0 {
                Correction::RotateLeft { rate }
            } else {
                Correction::RotateRight { rate }
            });
        }

        if dy.abs() > self.alt_deadband_px {
            return Some(if dy > 0.0 { Correction::Up } else { Correction::Down });
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use airlink_io::core::types::{CameraId, Drivetrain};
    use approx::assert_relative_eq;

    const CENTER: PixelPoint = PixelPoint { x: 320.0, y: 240.0 };

    /// Object placed so that center - object = (dx, dy)
    fn decide(dx: f32, dy: f32) -> Option<Correction> {
        let object = PixelPoint::new(CENTER.x - dx, CENTER.y - dy);
        CorrectionConfig::default().decide(object, CENTER)
    }

    #[test]
    fn test_yaw_low_rate_both_directions() {
        assert_eq!(decide(50.0, 0.0), Some(Correction::RotateLeft { rate: 4.0 }));
        assert_eq!(decide(-50.0, 0.0), Some(Correction::RotateRight { rate: 4.0 }));
    }

    #[test]
    fn test_yaw_high_rate() {
        assert_eq!(decide(150.0, 0.0), Some(Correction::RotateLeft { rate: 10.0 }));
        assert_eq!(decide(-150.0, 0.0), Some(Correction::RotateRight { rate: 10.0 }));
        // 3 × deadband exactly is still the low rate
        assert_eq!(decide(120.0, 0.0), Some(Correction::RotateLeft { rate: 4.0 }));
    }

    #[test]
    fn test_altitude() {
        assert_eq!(decide(10.0, 30.0), Some(Correction::Up));
        assert_eq!(decide(10.0, -30.0), Some(Correction::Down));
    }

    #[test]
    fn test_centered() {
        assert_eq!(decide(10.0, 10.0), None);
        assert_eq!(decide(0.0, 0.0), None);
    }

    #[test]
    fn test_yaw_has_priority() {
        assert_eq!(decide(50.0, 100.0), Some(Correction::RotateLeft { rate: 4.0 }));
        assert_eq!(decide(-50.0, -100.0), Some(Correction::RotateRight { rate: 4.0 }));
    }

    #[test]
    fn test_deadband_edges_do_not_trigger() {
        assert_eq!(decide(40.0, 0.0), None);
        assert_eq!(decide(-40.0, 0.0), None);
        assert_eq!(decide(0.0, 20.0), None);
        assert_eq!(decide(0.0, -20.0), None);
        assert_eq!(decide(40.0, 20.0), None);
    }

    #[test]
    fn test_custom_thresholds() {
        let config = CorrectionConfig {
            yaw_deadband_px: 10.0,
            alt_deadband_px: 5.0,
            high_yaw_rate: 20.0,
            low_yaw_rate: 2.0,
            high_rate_factor: 2.0,
            ..CorrectionConfig::default()
        };
        let at = |dx: f32, dy: f32| config.decide(PixelPoint::new(-dx, -dy), PixelPoint::default());
        assert_eq!(at(15.0, 0.0), Some(Correction::RotateLeft { rate: 2.0 }));
        assert_eq!(at(25.0, 0.0), Some(Correction::RotateLeft { rate: 20.0 }));
        assert_eq!(at(0.0, -6.0), Some(Correction::Down));
    }

    #[test]
    fn test_yaw_command_switches_to_rate_mode() {
        let params = FlightParams {
            yaw_is_rate: false,
            yaw_or_rate: 90.0,
            speed: 2.0,
            drivetrain: Drivetrain::MaxDegreeOfFreedom,
        };
        let camera = CameraRequest {
            enabled: true,
            camera: CameraId::FrontLeft,
        };
        let cmd = Correction::RotateRight { rate: 10.0 }.to_command(&params, &camera);
        assert_eq!(cmd.method, Method::RotateRight);
        assert!(cmd.yaw_is_rate);
        assert_relative_eq!(cmd.yaw_or_rate, 10.0);
        assert_relative_eq!(cmd.speed, 2.0);
        assert_eq!(cmd.drivetrain, Drivetrain::MaxDegreeOfFreedom);
        assert_eq!(cmd.camera_request(), camera);
    }

    #[test]
    fn test_altitude_command_keeps_yaw_settings() {
        let params = FlightParams {
            yaw_is_rate: false,
            yaw_or_rate: 45.0,
            ..FlightParams::default()
        };
        let cmd = Correction::Up.to_command(&params, &CameraRequest::default());
        assert_eq!(cmd.method, Method::Up);
        assert!(!cmd.yaw_is_rate);
        assert_relative_eq!(cmd.yaw_or_rate, 45.0);
    }
}
