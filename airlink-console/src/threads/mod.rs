//! Worker threads for the console.
//!
//! - video: accepts the drone's relay, publishes frames, feeds detection
//! - viewer-accept: registers MJPEG viewers
//! - detection: round-trips frames through the detection service, submits
//!   corrections
//! - command: sends pending commands, one at a time
//! - operator: parses stdin lines (optional)
//!
//! Listeners are bound before any thread starts, so a bind failure aborts
//! startup instead of leaving half the console running.

mod command;
mod detection;
mod operator;

pub use command::{CommandThread, log_reply};
pub use detection::DetectionThread;
pub use operator::OperatorThread;

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use airlink_io::core::types::Frame;

use crate::client::CommandClient;
use crate::config::ConsoleConfig;
use crate::detection::DetectionRelayClient;
use crate::error::{ConsoleError, Result};
use crate::multiplexer::FrameMultiplexer;
use crate::shared::SharedState;
use crate::video::VideoReceiver;

/// Thread handles for the console.
pub struct ThreadHandles {
    pub video: JoinHandle<()>,
    pub viewer: JoinHandle<()>,
    pub command: JoinHandle<()>,
    pub detection: Option<JoinHandle<()>>,
    /// Blocks on stdin; never joined
    pub operator: Option<JoinHandle<()>>,
    /// Viewer registry, for status reporting
    pub multiplexer: Arc<FrameMultiplexer>,
}

impl ThreadHandles {
    /// True when a thread that should run until shutdown has exited
    pub fn any_finished(&self) -> bool {
        self.video.is_finished()
            || self.viewer.is_finished()
            || self.command.is_finished()
            || self.detection.as_ref().is_some_and(|h| h.is_finished())
    }

    /// Join every worker except the operator thread
    pub fn join(self) {
        let workers = [
            ("video", Some(self.video)),
            ("viewer-accept", Some(self.viewer)),
            ("command", Some(self.command)),
            ("detection", self.detection),
        ];
        for (name, handle) in workers {
            if let Some(handle) = handle
                && let Err(e) = handle.join()
            {
                tracing::error!("{} thread panicked: {:?}", name, e);
            }
        }
    }
}

fn spawn<F>(name: &str, f: F) -> Result<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new()
        .name(name.into())
        .spawn(f)
        .map_err(|e| ConsoleError::Thread(format!("Failed to spawn {} thread: {}", name, e)))
}

/// Bind listeners and spawn all threads.
pub fn spawn_threads(config: &ConsoleConfig, shared_state: Arc<SharedState>) -> Result<ThreadHandles> {
    let multiplexer = Arc::new(FrameMultiplexer::bind(
        &config.viewer_address(),
        config.video.boundary.clone(),
        Duration::from_millis(config.video.viewer_write_timeout_ms),
    )?);
    tracing::info!("MJPEG viewers: http://{}/", multiplexer.local_addr()?);

    // Bounded to one frame: detection paces itself, the receiver drops the rest
    let (frame_tx, frame_rx) = crossbeam_channel::bounded::<Frame>(1);
    let detection_enabled = config.detection.enabled;

    let mut receiver = VideoReceiver::bind(
        &config.video.relay_listen,
        Duration::from_millis(config.video.relay_read_timeout_ms),
        config.video.max_frame_bytes,
        Arc::clone(&multiplexer),
        detection_enabled.then_some(frame_tx),
        shared_state.running_flag(),
    )?;

    let video = spawn("video", move || receiver.run())?;

    let viewer = {
        let multiplexer = Arc::clone(&multiplexer);
        let running = shared_state.running_flag();
        spawn("viewer-accept", move || multiplexer.run_accept(&running))?
    };

    let detection = if detection_enabled {
        let client = DetectionRelayClient::new(
            config.detection.address.clone(),
            Duration::from_millis(config.detection.connect_timeout_ms),
            Duration::from_millis(config.detection.io_timeout_ms),
        );
        tracing::info!("Detection service: {}", config.detection.address);
        let mut detection_thread = DetectionThread::new(
            client,
            config.correction.clone(),
            Arc::clone(&shared_state),
            frame_rx,
        );
        Some(spawn("detection", move || detection_thread.run())?)
    } else {
        tracing::info!("Detection disabled");
        None
    };

    let command = {
        let client = CommandClient::new(
            config.connection.command_address.clone(),
            Duration::from_millis(config.connection.connect_timeout_ms),
            Duration::from_millis(config.connection.reply_timeout_ms),
        )
        .with_maneuver_timeout(Duration::from_millis(config.connection.maneuver_timeout_ms))
        .with_shutdown(shared_state.running_flag());
        let mut command_thread =
            CommandThread::new(client, Arc::clone(&shared_state), config.poll_interval());
        spawn("command", move || command_thread.run())?
    };

    let operator = if config.operator.stdin {
        let state = Arc::clone(&shared_state);
        Some(spawn("operator", move || {
            let stdin = std::io::stdin();
            OperatorThread::new(stdin.lock(), state).run();
        })?)
    } else {
        None
    };

    Ok(ThreadHandles {
        video,
        viewer,
        command,
        detection,
        operator,
        multiplexer,
    })
}
