//! Detection service client.
//!
//! One synchronous round-trip per frame over a single TCP connection:
//!
//! ```text
//! request:  ┌──────────┬─────────────────┬──────────────┐
//!           │ A1 1D    │ length (u32 BE) │ frame bytes  │
//!           └──────────┴─────────────────┴──────────────┘
//! response: ┌──────────┬─────────────────┬──────────────┐
//!           │ A1 1D    │ length (u32 BE) │ UTF-8 JSON   │
//!           └──────────┴─────────────────┴──────────────┘
//! ```
//!
//! The connection is opened on first use and dropped on any failure
//! (timeout, I/O error, bad magic, oversize length, invalid JSON); the next
//! call reconnects.

use crate::correction::PixelPoint;
use crate::error::{ConsoleError, Result};
use serde::Deserialize;
use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Frame marker in both directions
pub const MAGIC: [u8; 2] = [0xA1, 0x1D];
/// Largest accepted response payload
pub const MAX_RESPONSE: usize = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

/// One detection, valid for the frame it was computed on
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionResult {
    pub object_px: PixelPoint,
    pub center_px: PixelPoint,
    /// 0×0 when the service omits it
    pub image_size: ImageSize,
    pub polar_r: f32,
    pub polar_theta: f32,
}

#[derive(Debug, Default, Deserialize)]
struct Polar {
    #[serde(default)]
    r_px: f32,
    #[serde(default)]
    theta_deg: f32,
}

/// Response body as sent by the service
#[derive(Debug, Deserialize)]
struct ResponseBody {
    #[serde(default)]
    center_px: Option<PixelPoint>,
    #[serde(default)]
    object_px: Option<PixelPoint>,
    #[serde(default)]
    polar_coordinates: Option<Polar>,
    #[serde(default)]
    image_size: Option<ImageSize>,
}

/// Parse a response body. `Ok(None)` means the service saw nothing.
pub fn parse_response(body: &[u8]) -> Result<Option<DetectionResult>> {
    let body: ResponseBody = serde_json::from_slice(body)?;
    let (Some(object_px), Some(center_px)) = (body.object_px, body.center_px) else {
        return Ok(None);
    };
    let polar = body.polar_coordinates.unwrap_or_default();
    Ok(Some(DetectionResult {
        object_px,
        center_px,
        image_size: body.image_size.unwrap_or_default(),
        polar_r: polar.r_px,
        polar_theta: polar.theta_deg,
    }))
}

/// Lazily connected client for the detection service
pub struct DetectionRelayClient {
    addr: String,
    connect_timeout: Duration,
    io_timeout: Duration,
    stream: Option<TcpStream>,
}

impl DetectionRelayClient {
    pub fn new(addr: impl Into<String>, connect_timeout: Duration, io_timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            connect_timeout,
            io_timeout,
            stream: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Send one frame and wait for its result
    pub fn detect(&mut self, frame: &[u8]) -> Result<Option<DetectionResult>> {
        if self.stream.is_none() {
            self.stream = Some(self.connect()?);
        }
        let Some(stream) = self.stream.as_mut() else {
            return Err(ConsoleError::Detection("Not connected".into()));
        };

        let outcome = round_trip(stream, frame).and_then(|body| parse_response(&body));
        if outcome.is_err()
            && let Some(stream) = self.stream.take()
        {
            let _ = stream.shutdown(Shutdown::Both);
        }
        outcome
    }

    fn connect(&self) -> Result<TcpStream> {
        let mut last_err = None;
        for addr in self.addr.to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, self.connect_timeout) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(self.io_timeout))?;
                    stream.set_write_timeout(Some(self.io_timeout))?;
                    if let Err(e) = stream.set_nodelay(true) {
                        tracing::warn!("Failed to set TCP_NODELAY: {}", e);
                    }
                    tracing::info!("Connected to detection service at {}", addr);
                    return Ok(stream);
                }
                Err(e) => last_err = Some(e),
            }
        }
        Err(match last_err {
            Some(e) => ConsoleError::Connection(e),
            None => ConsoleError::Config(format!("No address for {}", self.addr)),
        })
    }
}

fn round_trip(stream: &mut TcpStream, frame: &[u8]) -> Result<Vec<u8>> {
    let len = u32::try_from(frame.len())
        .map_err(|_| ConsoleError::Detection(format!("Frame too large: {} bytes", frame.len())))?;
    let mut request = Vec::with_capacity(6 + frame.len());
    request.extend_from_slice(&MAGIC);
    request.extend_from_slice(&len.to_be_bytes());
    request.extend_from_slice(frame);
    stream.write_all(&request)?;
    stream.flush()?;

    let mut header = [0u8; 6];
    stream.read_exact(&mut header)?;
    if header[..2] != MAGIC {
        return Err(ConsoleError::Detection(format!(
            "Bad magic {:02X} {:02X}",
            header[0], header[1]
        )));
    }
    let len = u32::from_be_bytes([header[2], header[3], header[4], header[5]]) as usize;
    if len > MAX_RESPONSE {
        return Err(ConsoleError::Detection(format!(
            "Response too large: {} bytes (max {})",
            len, MAX_RESPONSE
        )));
    }
    let mut body = vec![0u8; len];
    stream.read_exact(&mut body)?;
    Ok(body)
}
