//! AirLink console - operator console for the AirLink daemon
//!
//! ## Threads
//!
//! - **video**: accepts the drone's video relay, publishes every frame to the
//!   viewers and offers it to detection
//! - **viewer-accept**: registers MJPEG viewers (default port 8000)
//! - **detection**: one frame at a time through the detection service;
//!   off-center objects become correction commands
//! - **command**: sends the pending command every 50 ms, one in flight
//! - **operator**: stdin command lines
//!
//! Configuration: `AIRLINK_CONSOLE_CONFIG` (default `console.toml`), then the
//! `AIRLINK_*` endpoint overrides.

use airlink_console::config::ConsoleConfig;
use airlink_console::error::{ConsoleError, Result};
use airlink_console::shared::{OperatorSettings, SharedState};
use airlink_console::threads::spawn_threads;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};
use tracing::{info, warn};

fn main() -> Result<()> {
    let (config, source) = ConsoleConfig::from_env()?;

    // Initialize logging
    let directive = format!("airlink_console={}", config.logging.level)
        .parse::<tracing_subscriber::filter::Directive>()
        .map_err(|e| ConsoleError::Config(format!("Invalid log level: {}", e)))?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(directive))
        .init();

    info!("AirLink console v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: {}", source);
    info!("Command channel: {}", config.connection.command_address);
    info!("Video relay listener: {}", config.video.relay_listen);

    let settings = OperatorSettings {
        params: config.operator.flight_params(),
        camera: config.operator.camera_request(),
    };
    let shared_state = Arc::new(SharedState::new(settings));

    let handler_state = Arc::clone(&shared_state);
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        handler_state.signal_shutdown();
    })
    .map_err(|e| ConsoleError::Thread(format!("Failed to set signal handler: {}", e)))?;

    let handles = spawn_threads(&config, Arc::clone(&shared_state))?;

    // Main thread: monitor until shutdown
    let check_interval = Duration::from_millis(500);
    let stats_interval = Duration::from_secs(10);
    let mut last_stats = Instant::now();

    while shared_state.is_running() {
        std::thread::sleep(check_interval);

        if handles.any_finished() {
            warn!("A worker thread exited unexpectedly");
            break;
        }

        if last_stats.elapsed() >= stats_interval {
            tracing::debug!(
                "Status: {} replies, {} superseded, {} corrections, {} viewers",
                shared_state.replies.load(Ordering::Relaxed),
                shared_state.superseded.load(Ordering::Relaxed),
                shared_state.corrections.load(Ordering::Relaxed),
                handles.multiplexer.viewer_count()
            );
            last_stats = Instant::now();
        }
    }

    // Signal shutdown to all threads
    shared_state.signal_shutdown();
    info!("Waiting for threads to finish...");
    handles.join();

    info!("AirLink console finished");
    Ok(())
}
