//! Receiving end of the drone's video relay.
//!
//! The console binds, the drone connects. One relay connection is served at a
//! time. Each length-prefixed payload becomes a [`Frame`] stamped with its
//! receive time, then:
//!
//! - goes to [`FrameMultiplexer::publish`] for the viewers
//! - is offered to the detection stage with `try_send` on a bounded(1)
//!   channel, so frames arriving during a detection round-trip are skipped

use crate::error::{ConsoleError, Result};
use crate::multiplexer::FrameMultiplexer;
use airlink_io::core::types::Frame;
use airlink_io::streaming::framing::{is_disconnect, read_frame};
use crossbeam_channel::{Sender, TrySendError};
use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

const ACCEPT_POLL: Duration = Duration::from_millis(10);

/// Relay listener feeding the multiplexer and the detection stage
pub struct VideoReceiver {
    listener: TcpListener,
    read_timeout: Duration,
    max_frame: usize,
    multiplexer: Arc<FrameMultiplexer>,
    detection: Option<Sender<Frame>>,
    running: Arc<AtomicBool>,
    received: u64,
    skipped: u64,
}

impl VideoReceiver {
    /// Bind the relay listener. Failure is fatal for the console.
    pub fn bind(
        addr: &str,
        read_timeout: Duration,
        max_frame: usize,
        multiplexer: Arc<FrameMultiplexer>,
        detection: Option<Sender<Frame>>,
        running: Arc<AtomicBool>,
    ) -> Result<Self> {
        let listener = TcpListener::bind(addr).map_err(|e| {
            ConsoleError::Config(format!("Failed to bind video relay listener to {}: {}", addr, e))
        })?;
        listener.set_nonblocking(true)?;
        Ok(Self {
            listener,
            read_timeout,
            max_frame,
            multiplexer,
            detection,
            running,
            received: 0,
            skipped: 0,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept and drain relay connections until the running flag clears
    pub fn run(&mut self) {
        tracing::info!("Video relay listener on {:?}", self.listener.local_addr().ok());
        while self.running.load(Ordering::Relaxed) {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    tracing::info!("Drone video relay connected: {}", addr);
                    if let Err(e) = self.serve(stream) {
                        tracing::warn!("Video relay from {} failed: {}", addr, e);
                    }
                    tracing::info!(
                        "Drone video relay disconnected: {} ({} frames, {} skipped by detection)",
                        addr,
                        self.received,
                        self.skipped
                    );
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => thread::sleep(ACCEPT_POLL),
                Err(e) => tracing::error!("Video relay accept error: {}", e),
            }
        }
        tracing::info!("Video receiver stopped after {} frames", self.received);
    }

    fn serve(&mut self, mut stream: TcpStream) -> Result<()> {
        stream.set_nonblocking(false)?;
        stream.set_read_timeout(Some(self.read_timeout))?;

        while self.running.load(Ordering::Relaxed) {
            match read_frame(&mut stream, self.max_frame) {
                Ok(Some(payload)) => self.dispatch(Frame::new(payload)),
                Ok(None) => {}
                Err(e) if is_disconnect(&e) => return Ok(()),
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    fn dispatch(&mut self, frame: Frame) {
        self.received += 1;
        tracing::trace!("Frame #{} ({} bytes)", self.received, frame.len());
        self.multiplexer.publish(&frame);

        if let Some(tx) = &self.detection {
            match tx.try_send(frame) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => self.skipped += 1,
                Err(TrySendError::Disconnected(_)) => {
                    tracing::warn!("Detection stage gone; frames go to viewers only");
                    self.detection = None;
                }
            }
        }
        if self.received % 100 == 0 {
            tracing::debug!(
                "Received {} frames, {} viewers, {} skipped by detection",
                self.received,
                self.multiplexer.viewer_count(),
                self.skipped
            );
        }
    }
}
