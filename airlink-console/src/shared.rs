//! Shared state for the console threads.
//!
//! - operator thread: updates settings, submits commands
//! - detection thread: reads settings, submits corrections
//! - command thread: takes the pending command, performs the round-trip
//! - video and viewer threads: only watch the running flag

use airlink_io::core::types::{CameraRequest, Command, FlightParams};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Latest-wins single-slot mailbox for the next command.
///
/// A newer submission replaces one still waiting; only the newest intent is
/// ever sent.
#[derive(Debug, Default)]
pub struct CommandSlot {
    pending: Mutex<Option<Command>>,
}

impl CommandSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `command`, returning the one it replaced
    pub fn submit(&self, command: Command) -> Option<Command> {
        self.pending.lock().replace(command)
    }

    pub fn take(&self) -> Option<Command> {
        self.pending.lock().take()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_none()
    }
}

/// Operator settings copied into every command
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OperatorSettings {
    pub params: FlightParams,
    pub camera: CameraRequest,
}

/// State shared between all console threads
#[derive(Debug)]
pub struct SharedState {
    /// Cleared on ctrl-c or `quit`
    running: Arc<AtomicBool>,

    settings: Mutex<OperatorSettings>,

    pub slot: CommandSlot,

    /// Commands that got a reply
    pub replies: AtomicU64,

    /// Pending commands overwritten before they were sent
    pub superseded: AtomicU64,

    /// Corrections submitted by the detection loop
    pub corrections: AtomicU64,
}

impl SharedState {
    pub fn new(settings: OperatorSettings) -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
            settings: Mutex::new(settings),
            slot: CommandSlot::new(),
            replies: AtomicU64::new(0),
            superseded: AtomicU64::new(0),
            corrections: AtomicU64::new(0),
        }
    }

    /// Handle on the running flag for components that poll it directly
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn signal_shutdown(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    pub fn settings(&self) -> OperatorSettings {
        *self.settings.lock()
    }

    /// Modify the operator settings in place
    pub fn update_settings<F: FnOnce(&mut OperatorSettings)>(&self, f: F) -> OperatorSettings {
        let mut settings = self.settings.lock();
        f(&mut settings);
        *settings
    }

    /// Queue a command, counting any pending one it replaces
    pub fn submit(&self, command: Command) {
        if let Some(old) = self.slot.submit(command) {
            self.superseded.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("Pending {} replaced by {}", old.method, command.method);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use airlink_io::core::types::Method;

    fn command(method: Method) -> Command {
        Command::new(method, &FlightParams::default(), &CameraRequest::default())
    }

    #[test]
    fn test_slot_latest_wins() {
        let slot = CommandSlot::new();
        assert!(slot.take().is_none());

        assert!(slot.submit(command(Method::Up)).is_none());
        let replaced = slot.submit(command(Method::Left)).unwrap();
        assert_eq!(replaced.method, Method::Up);

        assert_eq!(slot.take().unwrap().method, Method::Left);
        assert!(slot.is_empty());
    }

    #[test]
    fn test_superseded_count() {
        let state = SharedState::new(OperatorSettings::default());
        state.submit(command(Method::Arm));
        state.submit(command(Method::Takeoff));
        state.submit(command(Method::Land));
        assert_eq!(state.superseded.load(Ordering::Relaxed), 2);
        assert_eq!(state.slot.take().unwrap().method, Method::Land);
    }

    #[test]
    fn test_settings_update_and_shutdown() {
        let state = SharedState::new(OperatorSettings::default());
        let flag = state.running_flag();
        let updated = state.update_settings(|s| s.params.speed = 1.5);
        assert_eq!(updated.params.speed, 1.5);
        assert_eq!(state.settings().params.speed, 1.5);

        assert!(state.is_running());
        state.signal_shutdown();
        assert!(!flag.load(Ordering::Relaxed));
    }
}
