//! Command executor: pending command, post-write grace period, completion.

use std::time::Duration;

use switchbot_types::{Command, ConnectionState};

use crate::events::{ControlCapability, Effect};

/// Grace period between a write acknowledgment and the disconnect.
pub const DISCONNECT_DELAY: Duration = Duration::from_millis(3000);

/// Holds the one pending command and guards the completion notification.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    pending: Option<Command>,
    notifier_armed: bool,
    timer_armed: bool,
    disconnect_delay: Duration,
}

impl Default for CommandExecutor {
    fn default() -> Self {
        Self::new(DISCONNECT_DELAY)
    }
}

impl CommandExecutor {
    /// Create an executor with the given post-write delay.
    pub fn new(disconnect_delay: Duration) -> Self {
        Self {
            pending: None,
            notifier_armed: true,
            timer_armed: false,
            disconnect_delay,
        }
    }

    /// The command waiting to be written, if any.
    pub fn pending(&self) -> Option<Command> {
        self.pending
    }

    /// Whether the completion has already been reported.
    pub fn is_completed(&self) -> bool {
        !self.notifier_armed
    }

    /// Whether the delayed-disconnect timer is running.
    pub fn is_timer_armed(&self) -> bool {
        self.timer_armed
    }

    /// Set the pending command, replacing any previous one.
    pub fn schedule(&mut self, command: Command) {
        self.pending = Some(command);
    }

    /// Drop the pending command and return it.
    pub fn take_pending(&mut self) -> Option<Command> {
        self.pending.take()
    }

    /// Write the pending command if the link and capability allow it.
    ///
    /// Returns whether a write was issued. Nothing is written unless the
    /// link is `Connected` and the capability is resolved.
    pub fn execute(
        &self,
        state: ConnectionState,
        capability: Option<ControlCapability>,
        effects: &mut Vec<Effect>,
    ) -> bool {
        let (Some(command), Some(capability)) = (self.pending, capability) else {
            return false;
        };
        if state != ConnectionState::Connected {
            return false;
        }
        effects.push(Effect::Write {
            capability,
            payload: command.payload(),
        });
        true
    }

    /// Handle a write acknowledgment.
    ///
    /// The status is not inspected: every acknowledgment clears the pending
    /// command and arms the delayed success + disconnect.
    pub fn on_write_acknowledged(&mut self, effects: &mut Vec<Effect>) {
        self.pending = None;
        if !self.timer_armed {
            self.timer_armed = true;
            effects.push(Effect::ArmDisconnectTimer(self.disconnect_delay));
        }
    }

    /// Handle the end of the grace period.
    pub fn on_timer_elapsed(&mut self, effects: &mut Vec<Effect>) {
        self.timer_armed = false;
        self.trigger_callback(true, effects);
    }

    /// Report the outcome once. Later calls are ignored.
    pub fn trigger_callback(&mut self, success: bool, effects: &mut Vec<Effect>) {
        if self.notifier_armed {
            self.notifier_armed = false;
            effects.push(Effect::Complete { success });
        }
    }
}
