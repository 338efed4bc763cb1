//! MJPEG fan-out to any number of viewers.
//!
//! Each viewer gets the HTTP preamble once on accept, then one multipart block
//! per frame:
//!
//! ```text
//! --<boundary>\r\n
//! Content-Type: image/jpeg\r\n
//! Content-Length: <n>\r\n
//! \r\n
//! <n bytes>
//! ```
//!
//! The block is built once per frame and the same bytes go to every viewer.
//! Writes run with a timeout; a viewer whose write fails or stalls is dropped
//! from the registry and its socket closed.

use crate::error::{ConsoleError, Result};
use airlink_io::core::types::Frame;
use parking_lot::Mutex;
use std::io::{self, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

const ACCEPT_POLL: Duration = Duration::from_millis(10);

/// HTTP response head announcing a multipart stream
pub fn preamble(boundary: &str) -> String {
    format!(
        "HTTP/1.0 200 OK\r\n\
         Server: AirLinkConsole/{}\r\n\
         Cache-Control: no-cache\r\n\
         Cache-Control: private\r\n\
         Pragma: no-cache\r\n\
         Content-Type: multipart/x-mixed-replace; boundary={}\r\n\
         \r\n",
        env!("CARGO_PKG_VERSION"),
        boundary
    )
}

/// One multipart block carrying a JPEG
pub fn frame_block(boundary: &str, jpeg: &[u8]) -> Vec<u8> {
    let head = format!(
        "--{}\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n",
        boundary,
        jpeg.len()
    );
    let mut block = Vec::with_capacity(head.len() + jpeg.len());
    block.extend_from_slice(head.as_bytes());
    block.extend_from_slice(jpeg);
    block
}

struct Viewer {
    stream: TcpStream,
    addr: SocketAddr,
}

/// Viewer registry plus its listening socket
pub struct FrameMultiplexer {
    listener: TcpListener,
    viewers: Mutex<Vec<Viewer>>,
    boundary: String,
    write_timeout: Duration,
}

impl FrameMultiplexer {
    /// Bind the viewer listener. Failure is fatal for the console.
    pub fn bind(addr: &str, boundary: impl Into<String>, write_timeout: Duration) -> Result<Self> {
        let listener = TcpListener::bind(addr).map_err(|e| {
            ConsoleError::Config(format!("Failed to bind viewer listener to {}: {}", addr, e))
        })?;
        listener.set_nonblocking(true)?;
        Ok(Self {
            listener,
            viewers: Mutex::new(Vec::new()),
            boundary: boundary.into(),
            write_timeout,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn viewer_count(&self) -> usize {
        self.viewers.lock().len()
    }

    /// Register every connection waiting on the listener
    pub fn accept_pending(&self) {
        loop {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    if let Err(e) = self.register(stream, addr) {
                        tracing::warn!("Viewer {} dropped during setup: {}", addr, e);
                    }
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    tracing::error!("Viewer accept error: {}", e);
                    break;
                }
            }
        }
    }

    fn register(&self, mut stream: TcpStream, addr: SocketAddr) -> Result<()> {
        stream.set_nonblocking(false)?;
        stream.set_write_timeout(Some(self.write_timeout))?;
        stream.write_all(preamble(&self.boundary).as_bytes())?;
        stream.flush()?;

        let mut viewers = self.viewers.lock();
        viewers.push(Viewer { stream, addr });
        tracing::info!("Viewer connected: {} ({} total)", addr, viewers.len());
        Ok(())
    }

    /// Accept viewers until the running flag clears
    pub fn run_accept(&self, running: &AtomicBool) {
        tracing::info!("Viewer stream listening on {:?}", self.listener.local_addr().ok());
        while running.load(Ordering::Relaxed) {
            self.accept_pending();
            thread::sleep(ACCEPT_POLL);
        }
        tracing::info!("Viewer listener stopped");
    }

    /// Send a frame to every viewer, dropping the ones that fail
    pub fn publish(&self, frame: &Frame) {
        if frame.is_empty() {
            return;
        }
        let block = frame_block(&self.boundary, &frame.data);

        let mut viewers = self.viewers.lock();
        viewers.retain_mut(|viewer| {
            let sent = viewer
                .stream
                .write_all(&block)
                .and_then(|()| viewer.stream.flush());
            match sent {
                Ok(()) => true,
                Err(e) => {
                    tracing::info!("Viewer {} removed: {}", viewer.addr, e);
                    false
                }
            }
        });
        tracing::trace!("Published {} bytes to {} viewers", block.len(), viewers.len());
    }
}
