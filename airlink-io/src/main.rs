//! AirLink IO - drone-side daemon
//!
//! ## Sockets
//!
//! - **Command channel (TCP, default 127.0.0.1:20001)**: one length-prefixed
//!   command in, one fixed-size reply out, one operator at a time
//! - **Video relay (TCP client, default 127.0.0.1:20002)**: camera frames pushed
//!   to the console while the operator has streaming enabled
//!
//! Configuration comes from the TOML file named by `AIRLINK_CONFIG`
//! (default `airlink.toml`, built-in defaults when absent).

use airlink_io::Config;
use airlink_io::core::driver::share;
use airlink_io::devices::create_device;
use airlink_io::error::{Error, Result};
use airlink_io::pilot::Pilot;
use airlink_io::streaming::{CommandChannel, Dispatcher, TcpFrameSink, VideoControl, VideoRelay};
use airlink_io::telemetry::TelemetrySnapshotBuilder;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

fn main() -> Result<()> {
    let (config, source) = Config::from_env()?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    log::info!("AirLink IO v{} starting...", env!("CARGO_PKG_VERSION"));
    log::info!("Using config: {}", source);
    log::info!(
        "Device: {} ({})",
        config.device.name,
        config.device.device_type
    );

    let flight = share(create_device(&config.device)?);
    let video = Arc::new(VideoControl::new());

    // Set up shutdown signal handler
    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| Error::Other(format!("Error setting Ctrl-C handler: {}", e)))?;

    // Bind before spawning anything so a busy port fails fast
    let pilot = Pilot::new(
        Arc::clone(&flight),
        config.maneuver.clone(),
        config.device.simulation.speed_factor,
    );
    let dispatcher = Dispatcher::new(
        pilot,
        TelemetrySnapshotBuilder::new(Arc::clone(&flight)),
        Arc::clone(&video),
    );
    let mut channel = CommandChannel::bind(
        &config.network.command_address,
        dispatcher,
        Arc::clone(&running),
        config.network.max_command_frame,
    )?;

    let sink = TcpFrameSink::new(
        config.network.video_relay_address.clone(),
        Duration::from_millis(config.video.connect_timeout_ms),
        config.video.max_frame_bytes,
    );
    let mut relay = VideoRelay::new(
        Arc::clone(&flight),
        Arc::clone(&video),
        sink,
        Arc::clone(&running),
        Duration::from_millis(config.video.active_interval_ms),
        Duration::from_millis(config.video.idle_interval_ms),
    );
    log::info!(
        "Video relay target {}",
        config.network.video_relay_address
    );
    let relay_handle = thread::Builder::new()
        .name("video-relay".to_string())
        .spawn(move || relay.run())
        .map_err(|e| Error::Other(format!("Failed to spawn video relay: {}", e)))?;

    log::info!("AirLink IO running. Press Ctrl-C to stop.");
    let result = channel.run();

    // Shutdown
    log::info!("Shutting down...");
    running.store(false, Ordering::Relaxed);
    if relay_handle.join().is_err() {
        log::error!("Video relay thread panicked");
    }

    log::info!("AirLink IO stopped");
    result
}
