//! One-way camera relay
//!
//! Runs on its own thread, independent of the command channel. The only state
//! shared with the channel is [`VideoControl`], updated from every command.
//!
//! ```text
//! enabled:  capture(camera) ─▶ sink.send ─▶ sleep active interval (100 ms)
//! disabled: sleep idle interval (1 s)
//! ```
//!
//! Frames are sent unacknowledged, one length-prefixed frame per capture. A
//! send failure drops that frame; the TCP sink reconnects on the next one.

use crate::core::driver::SharedFlight;
use crate::core::types::{CameraId, CameraRequest};
use crate::error::{Error, Result};
use crate::streaming::framing::write_frame;
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::thread;
use std::time::Duration;

/// Longest uninterrupted sleep, so shutdown is noticed promptly
const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// Operator-controlled streaming switch and camera selection
#[derive(Debug, Default)]
pub struct VideoControl {
    enabled: AtomicBool,
    camera: AtomicU32,
}

impl VideoControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the camera request carried by a command
    pub fn apply(&self, request: CameraRequest) {
        self.camera.store(request.camera.as_u32(), Ordering::Relaxed);
        let was = self.enabled.swap(request.enabled, Ordering::Relaxed);
        if was != request.enabled {
            log::info!(
                "Video relay {} ({})",
                if request.enabled { "enabled" } else { "disabled" },
                request.camera.name()
            );
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn camera(&self) -> CameraId {
        CameraId::from_u32(self.camera.load(Ordering::Relaxed)).unwrap_or_default()
    }
}

/// Destination for captured frames
pub trait FrameSink: Send {
    fn send(&mut self, frame: &[u8]) -> Result<()>;
}

/// Sends frames to the console's relay listener, connecting lazily
pub struct TcpFrameSink {
    addr: String,
    connect_timeout: Duration,
    max_frame: usize,
    stream: Option<TcpStream>,
}

impl TcpFrameSink {
    pub fn new(addr: impl Into<String>, connect_timeout: Duration, max_frame: usize) -> Self {
        Self {
            addr: addr.into(),
            connect_timeout,
            max_frame,
            stream: None,
        }
    }

    fn connect(&self) -> Result<TcpStream> {
        let mut last_err = None;
        for addr in self.addr.to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, self.connect_timeout) {
                Ok(stream) => {
                    stream.set_nodelay(true)?;
                    stream.set_write_timeout(Some(Duration::from_secs(1)))?;
                    log::info!("Video relay connected to {}", addr);
                    return Ok(stream);
                }
                Err(e) => last_err = Some(e),
            }
        }
        Err(match last_err {
            Some(e) => Error::Io(e),
            None => Error::Other(format!("No address for {}", self.addr)),
        })
    }
}

impl FrameSink for TcpFrameSink {
    fn send(&mut self, frame: &[u8]) -> Result<()> {
        if frame.len() > self.max_frame {
            return Err(Error::FrameTooLarge {
                len: frame.len(),
                max: self.max_frame,
            });
        }
        if self.stream.is_none() {
            self.stream = Some(self.connect()?);
        }
        let Some(stream) = self.stream.as_mut() else {
            return Err(Error::Disconnected);
        };
        if let Err(e) = write_frame(stream, frame) {
            if let Some(stream) = self.stream.take() {
                let _ = stream.shutdown(Shutdown::Both);
            }
            return Err(e);
        }
        Ok(())
    }
}

/// Capture loop feeding a [`FrameSink`]
pub struct VideoRelay<S: FrameSink> {
    flight: SharedFlight,
    control: Arc<VideoControl>,
    sink: S,
    running: Arc<AtomicBool>,
    active_interval: Duration,
    idle_interval: Duration,
}

impl<S: FrameSink> VideoRelay<S> {
    pub fn new(
        flight: SharedFlight,
        control: Arc<VideoControl>,
        sink: S,
        running: Arc<AtomicBool>,
        active_interval: Duration,
        idle_interval: Duration,
    ) -> Self {
        Self {
            flight,
            control,
            sink,
            running,
            active_interval,
            idle_interval,
        }
    }

    /// Loop until the running flag clears
    pub fn run(&mut self) {
        log::info!("Video relay started");
        let mut sent = 0u64;
        let mut failing = false;

        while self.running.load(Ordering::Relaxed) {
            if !self.control.enabled() {
                self.sleep(self.idle_interval);
                continue;
            }

            let camera = self.control.camera();
            let captured = self.flight.lock().capture(camera);
            match captured {
                Ok(frame) => match self.sink.send(&frame) {
                    Ok(()) => {
                        sent += 1;
                        if failing {
                            log::info!("Video relay recovered");
                            failing = false;
                        }
                        log::trace!("Relayed {} frame #{} ({} bytes)", camera.name(), sent, frame.len());
                    }
                    Err(e) => {
                        if !failing {
                            log::warn!("Video relay send failed: {}", e);
                            failing = true;
                        } else {
                            log::debug!("Video relay send failed: {}", e);
                        }
                    }
                },
                Err(e) => log::warn!("Capture from {} failed: {}", camera.name(), e),
            }
            self.sleep(self.active_interval);
        }
        log::info!("Video relay stopped after {} frames", sent);
    }

    fn sleep(&self, total: Duration) {
        let mut remaining = total;
        while !remaining.is_zero() && self.running.load(Ordering::Relaxed) {
            let slice = remaining.min(SLEEP_SLICE);
            thread::sleep(slice);
            remaining -= slice;
        }
    }
}
