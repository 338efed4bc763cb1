//! Length-prefixed message framing over TCP
//!
//! ```text
//! ┌──────────────────┬──────────────────────────┐
//! │ Length (4 bytes) │ Payload (variable)       │
//! │ Big-endian u32   │ command / reply / frame  │
//! └──────────────────┴──────────────────────────┘
//! ```
//!
//! Readers run with a socket read timeout so their loops can check a shutdown
//! flag. A timeout before the first byte of a frame is reported as "nothing
//! yet" (`Ok(None)`). Once a frame has started, timeouts are retried so the
//! stream never loses sync; a peer stalled mid-frame for too long is an error.

use crate::error::{Error, Result};
use std::io::{self, Read, Write};

/// Consecutive read timeouts tolerated inside one frame
const MAX_STALLS: u32 = 20;

/// Payload limit for the command channel
pub const MAX_COMMAND_FRAME: usize = 10 * 1024;
/// Payload limit for the video relay
pub const MAX_VIDEO_FRAME: usize = 16 * 1024 * 1024;

#[inline]
pub fn is_timeout(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

/// True for errors that mean the peer went away
pub fn is_disconnect(e: &Error) -> bool {
    match e {
        Error::Disconnected => true,
        Error::Io(io_err) => matches!(
            io_err.kind(),
            io::ErrorKind::UnexpectedEof
                | io::ErrorKind::ConnectionReset
                | io::ErrorKind::ConnectionAborted
                | io::ErrorKind::BrokenPipe
        ),
        _ => false,
    }
}

/// Write one frame and flush
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> Result<()> {
    let len = u32::try_from(payload.len()).map_err(|_| Error::FrameTooLarge {
        len: payload.len(),
        max: u32::MAX as usize,
    })?;
    // Single write keeps prefix and payload in one segment
    let mut buf = Vec::with_capacity(4 + payload.len());
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(payload);
    writer.write_all(&buf)?;
    writer.flush()?;
    Ok(())
}

/// Read one frame of at most `max_len` bytes.
///
/// Returns `Ok(None)` when the read timed out before a frame started.
pub fn read_frame<R: Read>(reader: &mut R, max_len: usize) -> Result<Option<Vec<u8>>> {
    let mut len_buf = [0u8; 4];
    loop {
        match reader.read(&mut len_buf[..1]) {
            Ok(0) => return Err(Error::Disconnected),
            Ok(_) => break,
            Err(e) if is_timeout(&e) => return Ok(None),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::Io(e)),
        }
    }
    read_full(reader, &mut len_buf[1..])?;

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > max_len {
        return Err(Error::FrameTooLarge { len, max: max_len });
    }

    let mut payload = vec![0u8; len];
    read_full(reader, &mut payload)?;
    Ok(Some(payload))
}

/// Fill `buf`, retrying timeouts up to [`MAX_STALLS`] times in a row
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<()> {
    let mut filled = 0;
    let mut stalls = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => return Err(Error::Disconnected),
            Ok(n) => {
                filled += n;
                stalls = 0;
            }
            Err(e) if is_timeout(&e) => {
                stalls += 1;
                if stalls >= MAX_STALLS {
                    return Err(Error::Io(e));
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(Error::Io(e)),
        }
    }
    Ok(())
}
