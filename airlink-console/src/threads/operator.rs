//! Operator thread: reads command lines and turns them into commands or
//! settings changes.
//!
//! Blocks on input, so shutdown from elsewhere is only noticed after the next
//! line; `main` does not join this thread.

use std::io::BufRead;
use std::sync::Arc;

use airlink_io::core::types::Command;

use crate::operator::{HELP, OperatorInput, apply_setting, parse_line};
use crate::shared::SharedState;

pub struct OperatorThread<R: BufRead> {
    input: R,
    shared_state: Arc<SharedState>,
}

impl<R: BufRead> OperatorThread<R> {
    pub fn new(input: R, shared_state: Arc<SharedState>) -> Self {
        Self {
            input,
            shared_state,
        }
    }

    pub fn run(&mut self) {
        tracing::info!("Operator input ready (type `help`)");
        let mut line = String::new();

        while self.shared_state.is_running() {
            line.clear();
            match self.input.read_line(&mut line) {
                Ok(0) => {
                    tracing::info!("Operator input closed");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!("Operator input error: {}", e);
                    break;
                }
            }

            if !self.handle(&line) {
                break;
            }
        }
    }

    /// Act on one line. Returns false once the operator asked to quit.
    pub fn handle(&self, line: &str) -> bool {
        let input = match parse_line(line) {
            Ok(Some(input)) => input,
            Ok(None) => return true,
            Err(e) => {
                tracing::warn!("{}", e);
                return true;
            }
        };

        match input {
            OperatorInput::Send(method) => {
                let settings = self.shared_state.settings();
                self.shared_state
                    .submit(Command::new(method, &settings.params, &settings.camera));
            }
            OperatorInput::Help => println!("{}", HELP),
            OperatorInput::Quit => {
                tracing::info!("Operator requested shutdown");
                self.shared_state.signal_shutdown();
                return false;
            }
            setting => {
                let updated = self.shared_state.update_settings(|settings| {
                    apply_setting(&setting, settings);
                });
                tracing::info!(
                    "Settings: speed {:.1} m/s, yaw {} {:.1}, {:?}, camera {} {}",
                    updated.params.speed,
                    if updated.params.yaw_is_rate { "rate" } else { "angle" },
                    updated.params.yaw_or_rate,
                    updated.params.drivetrain,
                    updated.camera.camera.name(),
                    if updated.camera.enabled { "on" } else { "off" }
                );
            }
        }
        true
    }
}
