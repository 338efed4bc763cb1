//! Socket plumbing between the daemon and the console
//!
//! - [`framing`]: length-prefixed frames shared by every TCP stream
//! - [`command_channel`]: request/response command endpoint
//! - [`video_relay`]: one-way camera frame relay

pub mod command_channel;
pub mod framing;
pub mod video_relay;

pub use command_channel::{CommandChannel, Dispatcher};
pub use video_relay::{FrameSink, TcpFrameSink, VideoControl, VideoRelay};
