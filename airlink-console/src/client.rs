//! Command channel client.
//!
//! Strict request/response: one framed command out, one framed reply back,
//! nothing pipelined. Any failure drops the connection; the next request
//! reconnects.

use crate::error::{ConsoleError, Result};
use airlink_io::core::types::{Command, Method, Reply};
use airlink_io::core::wire::{REPLY_LEN, decode_reply, encode_command};
use airlink_io::streaming::framing::{read_frame, write_frame};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Reply frames are fixed size; anything bigger is a protocol error
const MAX_REPLY_FRAME: usize = 4 * REPLY_LEN;

/// Lazily connected REQ side of the command channel
pub struct CommandClient {
    addr: String,
    connect_timeout: Duration,
    reply_timeout: Duration,
    maneuver_timeout: Duration,
    running: Option<Arc<AtomicBool>>,
    stream: Option<TcpStream>,
}

impl CommandClient {
    pub fn new(addr: impl Into<String>, connect_timeout: Duration, reply_timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            connect_timeout,
            reply_timeout,
            maneuver_timeout: reply_timeout,
            running: None,
            stream: None,
        }
    }

    /// Reply timeout for takeoff, land and the box flight, which block the
    /// daemon for the whole maneuver
    pub fn with_maneuver_timeout(mut self, timeout: Duration) -> Self {
        self.maneuver_timeout = timeout.max(self.reply_timeout);
        self
    }

    /// Abandon a pending reply once `running` clears
    pub fn with_shutdown(mut self, running: Arc<AtomicBool>) -> Self {
        self.running = Some(running);
        self
    }

    fn timeout_for(&self, method: Method) -> Duration {
        match method {
            Method::Takeoff | Method::Land | Method::TestFlyBox => self.maneuver_timeout,
            _ => self.reply_timeout,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Send one command and block for its reply
    pub fn request(&mut self, command: &Command) -> Result<Reply> {
        if self.stream.is_none() {
            self.stream = Some(self.connect()?);
        }
        let timeout = self.timeout_for(command.method);
        let Some(stream) = self.stream.as_mut() else {
            return Err(ConsoleError::Protocol("Not connected".into()));
        };

        let outcome = exchange(stream, command, timeout, self.running.as_deref());
        if let Err(e) = &outcome {
            tracing::debug!("Dropping command connection: {}", e);
            self.disconnect();
        }
        outcome
    }

    pub fn disconnect(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }

    fn connect(&self) -> Result<TcpStream> {
        let mut last_err = None;
        for addr in self.addr.to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, self.connect_timeout) {
                Ok(stream) => {
                    // Short read timeout; `exchange` enforces the reply deadline
                    stream.set_read_timeout(Some(Duration::from_millis(100)))?;
                    stream.set_nodelay(true)?;
                    tracing::info!("Connected to command channel at {}", addr);
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

fn exchange(
    stream: &mut TcpStream,
    command: &Command,
    timeout: Duration,
    running: Option<&AtomicBool>,
) -> Result<Reply> {
    write_frame(stream, &encode_command(command))?;

    let deadline = Instant::now() + timeout;
    let bytes = loop {
        if let Some(bytes) = read_frame(stream, MAX_REPLY_FRAME)? {
            break bytes;
        }
        if running.is_some_and(|r| !r.load(Ordering::Relaxed)) {
            return Err(ConsoleError::Protocol(format!(
                "Shutting down while waiting for {} reply",
                command.method
            )));
        }
        if Instant::now() >= deadline {
            return Err(ConsoleError::Protocol(format!(
                "No reply to {} within {:?}",
                command.method, timeout
            )));
        }
    };

    let reply = decode_reply(&bytes)?;
    if reply.method != command.method {
        return Err(ConsoleError::Protocol(format!(
            "Reply echoes {} for request {}",
            reply.method, command.method
        )));
    }
    Ok(reply)
}
