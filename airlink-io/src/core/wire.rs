//! Fixed-layout binary records for the command channel
//!
//! Every field is little-endian with no padding. Records are written and read
//! field by field; the buffer length is checked before any field is touched.
//!
//! # Command (30 bytes)
//!
//! ```text
//! offset  size  field
//!      0     4  method          u32
//!      4     8  issued_at       u64   unix seconds
//!     12     1  yaw_is_rate     bool
//!     13     4  yaw_or_rate     f32
//!     17     4  speed           f32
//!     21     4  drivetrain      i32
//!     25     1  request_camera  bool
//!     26     4  camera_id       u32
//! ```
//!
//! # Reply (125 bytes)
//!
//! ```text
//! offset  size  record
//!      0     4  method echo     u32
//!      4    20  barometer       u64, f32 altitude, f32 pressure, f32 qnh
//!     24    32  imu             u64, f32 x3 angular velocity, f32 x3 linear accel
//!     56    49  gps             u64, f64 lat, f64 lon, f32 alt, f32 x3 velocity,
//!                               f32 eph, f32 epv, bool valid
//!    105    20  magnetometer    u64, f32 x3 field
//! ```
//!
//! Every reply is full length. Telemetry that was not gathered is zero.

use crate::core::types::{
    BarometerData, CameraId, Command, Drivetrain, GpsData, ImuData, MagnetometerData, Method,
    Reply,
};

/// Encoded command length
pub const COMMAND_LEN: usize = 30;
/// Encoded reply length
pub const REPLY_LEN: usize = 125;

/// Record decode failures
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WireError {
    #[error("record truncated: need {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("invalid {field} value {value}")]
    InvalidField { field: &'static str, value: i64 },
}

/// Sequential little-endian writer over a fixed buffer
struct Writer<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> Writer<'a> {
    fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn put(&mut self, bytes: &[u8]) {
        self.buf[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
    }

    fn u32(&mut self, v: u32) {
        self.put(&v.to_le_bytes());
    }

    fn i32(&mut self, v: i32) {
        self.put(&v.to_le_bytes());
    }

    fn u64(&mut self, v: u64) {
        self.put(&v.to_le_bytes());
    }

    fn f32(&mut self, v: f32) {
        self.put(&v.to_le_bytes());
    }

    fn f64(&mut self, v: f64) {
        self.put(&v.to_le_bytes());
    }

    fn f32x3(&mut self, v: [f32; 3]) {
        for x in v {
            self.f32(x);
        }
    }

    fn bool(&mut self, v: bool) {
        self.put(&[v as u8]);
    }
}

/// Sequential little-endian reader. Callers check the total length up front.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(&self.buf[self.pos..self.pos + N]);
        self.pos += N;
        out
    }

    fn u32(&mut self) -> u32 {
        u32::from_le_bytes(self.take())
    }

    fn i32(&mut self) -> i32 {
        i32::from_le_bytes(self.take())
    }

    fn u64(&mut self) -> u64 {
        u64::from_le_bytes(self.take())
    }

    fn f32(&mut self) -> f32 {
        f32::from_le_bytes(self.take())
    }

    fn f64(&mut self) -> f64 {
        f64::from_le_bytes(self.take())
    }

    fn f32x3(&mut self) -> [f32; 3] {
        [self.f32(), self.f32(), self.f32()]
    }

    fn bool(&mut self) -> bool {
        self.take::<1>()[0] != 0
    }
}

fn check_len(buf: &[u8], expected: usize) -> Result<(), WireError> {
    if buf.len() < expected {
        return Err(WireError::Truncated {
            expected,
            actual: buf.len(),
        });
    }
    Ok(())
}

fn method_from_wire(value: u32) -> Result<Method, WireError> {
    Method::from_u32(value).ok_or(WireError::InvalidField {
        field: "method",
        value: value as i64,
    })
}

pub fn encode_command(cmd: &Command) -> [u8; COMMAND_LEN] {
    let mut buf = [0u8; COMMAND_LEN];
    let mut w = Writer::new(&mut buf);
    w.u32(cmd.method.as_u32());
    w.u64(cmd.issued_at);
    w.bool(cmd.yaw_is_rate);
    w.f32(cmd.yaw_or_rate);
    w.f32(cmd.speed);
    w.i32(cmd.drivetrain.as_i32());
    w.bool(cmd.request_camera);
    w.u32(cmd.camera.as_u32());
    buf
}

/// Decode a command. Bytes past [`COMMAND_LEN`] are ignored.
pub fn decode_command(buf: &[u8]) -> Result<Command, WireError> {
    check_len(buf, COMMAND_LEN)?;
    let mut r = Reader::new(buf);
    let method = method_from_wire(r.u32())?;
    let issued_at = r.u64();
    let yaw_is_rate = r.bool();
    let yaw_or_rate = r.f32();
    let speed = r.f32();
    let drivetrain_raw = r.i32();
    let drivetrain = Drivetrain::from_i32(drivetrain_raw).ok_or(WireError::InvalidField {
        field: "drivetrain",
        value: drivetrain_raw as i64,
    })?;
    let request_camera = r.bool();
    let camera_raw = r.u32();
    let camera = CameraId::from_u32(camera_raw).ok_or(WireError::InvalidField {
        field: "camera_id",
        value: camera_raw as i64,
    })?;

    Ok(Command {
        method,
        issued_at,
        yaw_is_rate,
        yaw_or_rate,
        speed,
        drivetrain,
        request_camera,
        camera,
    })
}

pub fn encode_reply(reply: &Reply) -> [u8; REPLY_LEN] {
    let mut buf = [0u8; REPLY_LEN];
    let mut w = Writer::new(&mut buf);
    w.u32(reply.method.as_u32());

    let b = &reply.barometer;
    w.u64(b.time_stamp);
    w.f32(b.altitude);
    w.f32(b.pressure);
    w.f32(b.qnh);

    let i = &reply.imu;
    w.u64(i.time_stamp);
    w.f32x3(i.angular_velocity);
    w.f32x3(i.linear_acceleration);

    let g = &reply.gps;
    w.u64(g.time_stamp);
    w.f64(g.latitude);
    w.f64(g.longitude);
    w.f32(g.altitude);
    w.f32x3(g.velocity);
    w.f32(g.eph);
    w.f32(g.epv);
    w.bool(g.is_valid);

    let m = &reply.magnetometer;
    w.u64(m.time_stamp);
    w.f32x3(m.magnetic_field_body);
    buf
}

/// Decode a reply. Bytes past [`REPLY_LEN`] are ignored.
pub fn decode_reply(buf: &[u8]) -> Result<Reply, WireError> {
    check_len(buf, REPLY_LEN)?;
    let mut r = Reader::new(buf);
    let method = method_from_wire(r.u32())?;

    let barometer = BarometerData {
        time_stamp: r.u64(),
        altitude: r.f32(),
        pressure: r.f32(),
        qnh: r.f32(),
    };
    let imu = ImuData {
        time_stamp: r.u64(),
        angular_velocity: r.f32x3(),
        linear_acceleration: r.f32x3(),
    };
    let gps = GpsData {
        time_stamp: r.u64(),
        latitude: r.f64(),
        longitude: r.f64(),
        altitude: r.f32(),
        velocity: r.f32x3(),
        eph: r.f32(),
        epv: r.f32(),
        is_valid: r.bool(),
    };
    let magnetometer = MagnetometerData {
        time_stamp: r.u64(),
        magnetic_field_body: r.f32x3(),
    };

    Ok(Reply {
        method,
        barometer,
        imu,
        gps,
        magnetometer,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{CameraRequest, FlightParams};

    fn sample_reply(method: Method) -> Reply {
        Reply {
            method,
            barometer: BarometerData {
                time_stamp: 1_700_000_000_123_456,
                altitude: 125.5,
                pressure: 99_800.25,
                qnh: 1013.25,
            },
            imu: ImuData {
                time_stamp: 1_700_000_000_123_457,
                angular_velocity: [0.01, -0.02, f32::MAX],
                linear_acceleration: [0.1, f32::MIN, -9.81],
            },
            gps: GpsData {
                time_stamp: u64::MAX,
                latitude: 47.641468,
                longitude: -122.140165,
                altitude: 124.0,
                velocity: [1.0, -2.0, 0.5],
                eph: 0.3,
                epv: 0.4,
                is_valid: true,
            },
            magnetometer: MagnetometerData {
                time_stamp: 42,
                magnetic_field_body: [0.2, 0.0, 0.45],
            },
        }
    }

    #[test]
    fn test_command_roundtrip_every_method() {
        let params = FlightParams {
            yaw_is_rate: false,
            yaw_or_rate: -45.0,
            speed: f32::MAX,
            drivetrain: Drivetrain::MaxDegreeOfFreedom,
        };
        let camera = CameraRequest {
            enabled: true,
            camera: CameraId::BackCenter,
        };
        for method in Method::ALL {
            let cmd = Command::new(method, &params, &camera);
            let bytes = encode_command(&cmd);
            assert_eq!(decode_command(&bytes).unwrap(), cmd);
        }
    }

    #[test]
    fn test_command_layout() {
        let cmd = Command {
            method: Method::RotateRight,
            issued_at: 0x0102_0304_0506_0708,
            yaw_is_rate: true,
            yaw_or_rate: 1.0,
            speed: 5.0,
            drivetrain: Drivetrain::ForwardOnly,
            request_camera: true,
            camera: CameraId::BottomCenter,
        };
        let bytes = encode_command(&cmd);
        assert_eq!(&bytes[0..4], &[17, 0, 0, 0]);
        assert_eq!(&bytes[4..12], &[8, 7, 6, 5, 4, 3, 2, 1]);
        assert_eq!(bytes[12], 1);
        assert_eq!(&bytes[13..17], &1.0f32.to_le_bytes());
        assert_eq!(&bytes[17..21], &5.0f32.to_le_bytes());
        assert_eq!(&bytes[21..25], &[1, 0, 0, 0]);
        assert_eq!(bytes[25], 1);
        assert_eq!(&bytes[26..30], &[3, 0, 0, 0]);
    }

    #[test]
    fn test_reply_roundtrip_populated() {
        let reply = sample_reply(Method::GpsData);
        let bytes = encode_reply(&reply);
        assert_eq!(bytes.len(), REPLY_LEN);
        assert_eq!(decode_reply(&bytes).unwrap(), reply);
    }

    #[test]
    fn test_empty_reply_is_full_length_and_zeroed() {
        let bytes = encode_reply(&Reply::empty(Method::Connect));
        assert_eq!(bytes.len(), REPLY_LEN);
        assert!(bytes.iter().all(|&b| b == 0));

        let bytes = encode_reply(&Reply::empty(Method::Land));
        assert_eq!(&bytes[0..4], &[4, 0, 0, 0]);
        assert!(bytes[4..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_truncated_command_rejected() {
        let cmd = Command::new(
            Method::Arm,
            &FlightParams::default(),
            &CameraRequest::default(),
        );
        let bytes = encode_command(&cmd);
        assert_eq!(
            decode_command(&bytes[..COMMAND_LEN - 1]),
            Err(WireError::Truncated {
                expected: COMMAND_LEN,
                actual: COMMAND_LEN - 1
            })
        );
        assert!(decode_command(&[]).is_err());
    }

    #[test]
    fn test_trailing_bytes_ignored() {
        let cmd = Command::new(
            Method::Takeoff,
            &FlightParams::default(),
            &CameraRequest::default(),
        );
        let mut bytes = encode_command(&cmd).to_vec();
        bytes.extend_from_slice(&[0xFF; 16]);
        assert_eq!(decode_command(&bytes).unwrap(), cmd);
    }

    #[test]
    fn test_invalid_enum_values_rejected() {
        let cmd = Command::new(
            Method::Up,
            &FlightParams::default(),
            &CameraRequest::default(),
        );

        let mut bad_method = encode_command(&cmd);
        bad_method[0..4].copy_from_slice(&18u32.to_le_bytes());
        assert_eq!(
            decode_command(&bad_method),
            Err(WireError::InvalidField {
                field: "method",
                value: 18
            })
        );

        let mut bad_drive = encode_command(&cmd);
        bad_drive[21..25].copy_from_slice(&(-1i32).to_le_bytes());
        assert!(matches!(
            decode_command(&bad_drive),
            Err(WireError::InvalidField {
                field: "drivetrain",
                ..
            })
        ));

        let mut bad_camera = encode_command(&cmd);
        bad_camera[26..30].copy_from_slice(&5u32.to_le_bytes());
        assert!(matches!(
            decode_command(&bad_camera),
            Err(WireError::InvalidField {
                field: "camera_id",
                ..
            })
        ));
    }

    #[test]
    fn test_nonzero_bool_is_true() {
        let cmd = Command::new(
            Method::Down,
            &FlightParams::default(),
            &CameraRequest::default(),
        );
        let mut bytes = encode_command(&cmd);
        bytes[25] = 0x7F;
        assert!(decode_command(&bytes).unwrap().request_camera);
    }
}
