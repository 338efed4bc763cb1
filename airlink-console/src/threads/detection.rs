//! Detection thread: frame → detection service → correction command.
//!
//! Frames arrive on a bounded(1) channel; the receiver skips frames while a
//! round-trip is running. A failed round-trip counts as "no detection" for
//! that cycle and the client reconnects on the next frame.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use airlink_io::core::types::Frame;
use crossbeam_channel::{Receiver, RecvTimeoutError};

use crate::correction::CorrectionConfig;
use crate::detection::DetectionRelayClient;
use crate::shared::SharedState;

const RECV_POLL: Duration = Duration::from_millis(100);

pub struct DetectionThread {
    client: DetectionRelayClient,
    policy: CorrectionConfig,
    shared_state: Arc<SharedState>,
    frames: Receiver<Frame>,
}

impl DetectionThread {
    pub fn new(
        client: DetectionRelayClient,
        policy: CorrectionConfig,
        shared_state: Arc<SharedState>,
        frames: Receiver<Frame>,
    ) -> Self {
        Self {
            client,
            policy,
            shared_state,
            frames,
        }
    }

    pub fn run(&mut self) {
        tracing::info!(
            "Detection thread started (corrections {})",
            if self.policy.enabled { "on" } else { "off" }
        );
        let mut failing = false;
        let mut detections = 0u64;

        while self.shared_state.is_running() {
            let frame = match self.frames.recv_timeout(RECV_POLL) {
                Ok(frame) => frame,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            };

            let result = match self.client.detect(&frame.data) {
                Ok(result) => {
                    if failing {
                        tracing::info!("Detection service recovered");
                        failing = false;
                    }
                    result
                }
                Err(e) => {
                    if failing {
                        tracing::debug!("Detection failed: {}", e);
                    } else {
                        tracing::warn!("Detection failed: {}", e);
                        failing = true;
                    }
                    None
                }
            };

            let Some(result) = result else {
                tracing::trace!("No detection in frame at {} us", frame.timestamp_us);
                continue;
            };
            detections += 1;

            let Some(correction) = self.policy.decide(result.object_px, result.center_px) else {
                tracing::debug!(
                    "Target centered (r {:.0} px, theta {:.0} deg)",
                    result.polar_r,
                    result.polar_theta
                );
                continue;
            };
            if !self.policy.enabled {
                tracing::debug!("Correction {:?} suppressed", correction);
                continue;
            }

            let settings = self.shared_state.settings();
            let command = correction.to_command(&settings.params, &settings.camera);
            tracing::info!(
                "Correction: {} (object {:.0},{:.0} center {:.0},{:.0})",
                command.method,
                result.object_px.x,
                result.object_px.y,
                result.center_px.x,
                result.center_px.y
            );
            self.shared_state.submit(command);
            self.shared_state.corrections.fetch_add(1, Ordering::Relaxed);
        }

        tracing::info!("Detection thread shutting down after {} detections", detections);
    }
}
