//! Request/response command channel
//!
//! One operator connection is served at a time; further connections are
//! rejected while a session is active.
//!
//! # Session Threads
//!
//! ```text
//!   socket ──▶ cmd-receiver ──▶ inbound SafeQueue ──▶ dispatcher (channel thread)
//!                                                        │ decode, fly, snapshot
//!   socket ◀── cmd-sender ◀── outbound SafeQueue ◀──────┘
//! ```
//!
//! Every decoded command yields exactly one reply, in request order. A command
//! whose maneuver fails still gets a full-length reply with zeroed telemetry.
//! Malformed buffers are logged and dropped without a reply.
//!
//! # Shutdown
//!
//! The receiver pushes `Closed` when the peer goes away. The dispatcher then
//! pushes `Close` to the sender, joins both threads and only then shuts the
//! socket down.

use crate::core::types::{Method, Reply};
use crate::core::wire::{decode_command, encode_reply};
use crate::error::{Error, Result};
use crate::pilot::Pilot;
use crate::queue::SafeQueue;
use crate::streaming::framing::{is_disconnect, read_frame, write_frame};
use crate::streaming::video_relay::VideoControl;
use crate::telemetry::TelemetrySnapshotBuilder;
use std::io;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

/// Socket read timeout; bounds how long the receiver takes to notice shutdown
const READ_TIMEOUT: Duration = Duration::from_millis(500);
/// Dispatcher wait between shutdown-flag checks
const DISPATCH_POLL: Duration = Duration::from_millis(100);
/// Accept loop sleep when no connection is pending
const ACCEPT_POLL: Duration = Duration::from_millis(10);

/// Receiver → dispatcher
#[derive(Debug)]
pub enum Inbound {
    Request(Vec<u8>),
    /// Peer closed or the read failed
    Closed,
}

/// Dispatcher → sender
#[derive(Debug)]
pub enum Outbound {
    Reply(Vec<u8>),
    Close,
}

/// Turns command buffers into replies
pub struct Dispatcher {
    pilot: Pilot,
    telemetry: TelemetrySnapshotBuilder,
    video: Arc<VideoControl>,
}

impl Dispatcher {
    pub fn new(pilot: Pilot, telemetry: TelemetrySnapshotBuilder, video: Arc<VideoControl>) -> Self {
        Self {
            pilot,
            telemetry,
            video,
        }
    }

    /// Handle one command buffer. `None` means the buffer was malformed and
    /// no reply is sent.
    pub fn handle(&mut self, buf: &[u8]) -> Option<Reply> {
        let cmd = match decode_command(buf) {
            Ok(cmd) => cmd,
            Err(e) => {
                log::warn!("Dropping malformed command ({} bytes): {}", buf.len(), e);
                return None;
            }
        };

        log::info!(
            "Command: {} (speed {:.1}, camera {}{})",
            cmd.method,
            cmd.speed,
            cmd.camera.name(),
            if cmd.request_camera { " on" } else { "" }
        );
        self.pilot.set_params(cmd.params());
        self.video.apply(cmd.camera_request());

        if let Err(e) = self.pilot.execute(cmd.method) {
            log::error!("Command {} failed: {}", cmd.method, e);
            return Some(Reply::empty(cmd.method));
        }

        Some(match cmd.method {
            Method::Connect => Reply::empty(Method::Connect),
            method => self.telemetry.snapshot(method),
        })
    }
}

/// Listening command endpoint
pub struct CommandChannel {
    listener: TcpListener,
    dispatcher: Dispatcher,
    running: Arc<AtomicBool>,
    max_frame: usize,
}

impl CommandChannel {
    /// Bind the listening socket. Failure here is fatal for the daemon.
    pub fn bind(
        addr: &str,
        dispatcher: Dispatcher,
        running: Arc<AtomicBool>,
        max_frame: usize,
    ) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .map_err(|e| Error::Other(format!("Failed to bind command channel to {}: {}", addr, e)))?;
        listener.set_nonblocking(true)?;
        Ok(Self {
            listener,
            dispatcher,
            running,
            max_frame,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept and serve operator sessions until the running flag clears
    pub fn run(&mut self) -> Result<()> {
        log::info!("Command channel listening on {}", self.local_addr()?);
        while self.running.load(Ordering::Relaxed) {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    log::info!("Operator connected: {}", addr);
                    if let Err(e) = self.serve(stream) {
                        log::error!("Session with {} ended with error: {}", addr, e);
                    }
                    log::info!("Operator disconnected: {}", addr);
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL);
                }
                Err(e) => {
                    log::error!("Accept error: {}", e);
                }
            }
        }
        log::info!("Command channel stopped");
        Ok(())
    }

    /// Close connections that arrive while a session is active
    fn reject_pending(&self) {
        while let Ok((stream, addr)) = self.listener.accept() {
            log::warn!("Rejecting operator {}: session already active", addr);
            let _ = stream.shutdown(Shutdown::Both);
        }
    }

    fn serve(&mut self, stream: TcpStream) -> Result<()> {
        stream.set_nonblocking(false)?;
        stream.set_read_timeout(Some(READ_TIMEOUT))?;
        if let Err(e) = stream.set_nodelay(true) {
            log::warn!("Failed to set TCP_NODELAY: {}", e);
        }

        let inbound: SafeQueue<Inbound> = SafeQueue::new();
        let outbound: SafeQueue<Outbound> = SafeQueue::new();
        let alive = Arc::new(AtomicBool::new(true));

        let receiver = {
            let mut reader = stream.try_clone()?;
            let inbound = inbound.clone();
            let alive = Arc::clone(&alive);
            let running = Arc::clone(&self.running);
            let max_frame = self.max_frame;
            thread::Builder::new()
                .name("cmd-receiver".to_string())
                .spawn(move || {
                    while running.load(Ordering::Relaxed) && alive.load(Ordering::Relaxed) {
                        match read_frame(&mut reader, max_frame) {
                            Ok(Some(buf)) => inbound.push(Inbound::Request(buf)),
                            Ok(None) => {}
                            Err(e) => {
                                if is_disconnect(&e) {
                                    log::debug!("Operator closed the connection");
                                } else {
                                    log::warn!("Command read failed: {}", e);
                                }
                                break;
                            }
                        }
                    }
                    inbound.push(Inbound::Closed);
                })
                .map_err(|e| Error::Other(format!("Failed to spawn command receiver: {}", e)))?
        };

        let sender = {
            let mut writer = stream.try_clone()?;
            let outbound = outbound.clone();
            let alive = Arc::clone(&alive);
            thread::Builder::new()
                .name("cmd-sender".to_string())
                .spawn(move || {
                    while let Outbound::Reply(bytes) = outbound.pop() {
                        if let Err(e) = write_frame(&mut writer, &bytes) {
                            log::warn!("Reply write failed: {}", e);
                            alive.store(false, Ordering::Relaxed);
                            // Wakes the receiver with EOF
                            let _ = writer.shutdown(Shutdown::Both);
                            break;
                        }
                    }
                })
                .map_err(|e| Error::Other(format!("Failed to spawn command sender: {}", e)))?
        };

        let mut replies = 0u64;
        while self.running.load(Ordering::Relaxed) {
            match inbound.pop_timeout(DISPATCH_POLL) {
                // Only reject while this session is still live; a queued
                // Closed means the waiting peer may be the same operator
                // reconnecting.
                None if !receiver.is_finished() && alive.load(Ordering::Relaxed) => {
                    self.reject_pending();
                }
                None => {}
                Some(Inbound::Closed) => break,
                Some(Inbound::Request(buf)) => {
                    if let Some(reply) = self.dispatcher.handle(&buf) {
                        outbound.push(Outbound::Reply(encode_reply(&reply).to_vec()));
                        replies += 1;
                    }
                }
            }
        }
        log::debug!("Session done after {} replies", replies);

        alive.store(false, Ordering::Relaxed);
        outbound.push(Outbound::Close);
        if sender.join().is_err() {
            log::error!("Command sender thread panicked");
        }
        if receiver.join().is_err() {
            log::error!("Command receiver thread panicked");
        }
        let _ = stream.shutdown(Shutdown::Both);
        Ok(())
    }
}
