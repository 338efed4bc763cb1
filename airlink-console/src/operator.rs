//! Operator line commands.
//!
//! | Line                          | Effect                              |
//! |-------------------------------|-------------------------------------|
//! | `connect` `arm` `disarm`      | send the command                    |
//! | `takeoff` `land` `box`        | send the command                    |
//! | `baro` `imu` `gps` `mag`      | query one sensor                    |
//! | `up` `down` `left` `right`    | 1 m step                            |
//! | `forward` `back`              | 1 m step                            |
//! | `rotl` `rotr`                 | rotate at the current yaw rate      |
//! | `speed <m/s>`                 | set translation speed               |
//! | `yaw rate <deg/s>`            | yaw in rate mode                    |
//! | `yaw angle <deg>`             | yaw to an absolute heading          |
//! | `drivetrain forward\|free`    | forward-only or free heading        |
//! | `camera on\|off\|<name>`      | stream switch or camera selection   |
//! | `help`, `quit`                |                                     |
//!
//! Settings apply from the next command on.

use crate::shared::OperatorSettings;
use airlink_io::core::types::{CameraId, Drivetrain, Method};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum OperatorInput {
    Send(Method),
    Speed(f32),
    YawRate(f32),
    YawAngle(f32),
    Drivetrain(Drivetrain),
    CameraEnabled(bool),
    Camera(CameraId),
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq)]
pub enum InputError {
    #[error("unknown command {0:?} (try `help`)")]
    Unknown(String),

    #[error("`{0}` needs a value")]
    MissingValue(&'static str),

    #[error("invalid value {value:?} for `{word}`")]
    BadValue { word: &'static str, value: String },
}

fn method_for(word: &str) -> Option<Method> {
    Some(match word {
        "connect" => Method::Connect,
        "arm" => Method::Arm,
        "disarm" => Method::Disarm,
        "takeoff" => Method::Takeoff,
        "land" => Method::Land,
        "box" => Method::TestFlyBox,
        "baro" => Method::BarometerData,
        "imu" => Method::ImuData,
        "gps" => Method::GpsData,
        "mag" => Method::MagnetometerData,
        "up" => Method::Up,
        "down" => Method::Down,
        "left" => Method::Left,
        "right" => Method::Right,
        "forward" => Method::Forward,
        "back" => Method::Back,
        "rotl" => Method::RotateLeft,
        "rotr" => Method::RotateRight,
        _ => return None,
    })
}

fn number(word: &'static str, value: Option<&str>) -> Result<f32, InputError> {
    let value = value.ok_or(InputError::MissingValue(word))?;
    value
        .parse::<f32>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| InputError::BadValue {
            word,
            value: value.to_string(),
        })
}

/// Parse one input line. Blank lines give `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<OperatorInput>, InputError> {
    let lowered = line.trim().to_ascii_lowercase();
    let mut words = lowered.split_whitespace();
    let Some(first) = words.next() else {
        return Ok(None);
    };

    if let Some(method) = method_for(first) {
        return Ok(Some(OperatorInput::Send(method)));
    }

    let input = match first {
        "speed" => {
            let speed = number("speed", words.next())?;
            if speed <= 0.0 {
                return Err(InputError::BadValue {
                    word: "speed",
                    value: speed.to_string(),
                });
            }
            OperatorInput::Speed(speed)
        }
        "yaw" => match words.next() {
            Some("rate") => OperatorInput::YawRate(number("yaw rate", words.next())?),
            Some("angle") => OperatorInput::YawAngle(number("yaw angle", words.next())?),
            Some(other) => {
                return Err(InputError::BadValue {
                    word: "yaw",
                    value: other.to_string(),
                });
            }
            None => return Err(InputError::MissingValue("yaw")),
        },
        "drivetrain" => match words.next() {
            Some("forward") => OperatorInput::Drivetrain(Drivetrain::ForwardOnly),
            Some("free") => OperatorInput::Drivetrain(Drivetrain::MaxDegreeOfFreedom),
            Some(other) => {
                return Err(InputError::BadValue {
                    word: "drivetrain",
                    value: other.to_string(),
                });
            }
            None => return Err(InputError::MissingValue("drivetrain")),
        },
        "camera" => match words.next() {
            Some("on") => OperatorInput::CameraEnabled(true),
            Some("off") => OperatorInput::CameraEnabled(false),
            Some(name) => match CameraId::from_name(name) {
                Some(camera) => OperatorInput::Camera(camera),
                None => {
                    return Err(InputError::BadValue {
                        word: "camera",
                        value: name.to_string(),
                    });
                }
            },
            None => return Err(InputError::MissingValue("camera")),
        },
        "help" | "?" => OperatorInput::Help,
        "quit" | "exit" => OperatorInput::Quit,
        _ => return Err(InputError::Unknown(first.to_string())),
    };
    Ok(Some(input))
}

/// Apply a settings input. Returns false for inputs that are not settings.
pub fn apply_setting(input: &OperatorInput, settings: &mut OperatorSettings) -> bool {
    match *input {
        OperatorInput::Speed(speed) => settings.params.speed = speed,
        OperatorInput::YawRate(rate) => {
            settings.params.yaw_is_rate = true;
            settings.params.yaw_or_rate = rate;
        }
        OperatorInput::YawAngle(angle) => {
            settings.params.yaw_is_rate = false;
            settings.params.yaw_or_rate = angle;
        }
        OperatorInput::Drivetrain(drivetrain) => settings.params.drivetrain = drivetrain,
        OperatorInput::CameraEnabled(enabled) => settings.camera.enabled = enabled,
        OperatorInput::Camera(camera) => settings.camera.camera = camera,
        OperatorInput::Send(_) | OperatorInput::Help | OperatorInput::Quit => return false,
    }
    true
}

pub const HELP: &str = "\
commands: connect arm disarm takeoff land box baro imu gps mag
          up down left right forward back rotl rotr
settings: speed <m/s> | yaw rate <deg/s> | yaw angle <deg>
          drivetrain forward|free | camera on|off|<name>
cameras:  front_center front_right front_left bottom_center back_center
other:    help quit";
