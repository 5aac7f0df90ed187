//! Link manager: the connection half of the controller.
//!
//! Tracks the [`ConnectionState`] of the one peripheral a controller is
//! bound to, and whether a connection handle has been allocated. The handle
//! outlives disconnects so a later command reconnects through it instead of
//! allocating a new one.

use switchbot_types::ConnectionState;

use crate::events::{Effect, LinkEvent};

/// Connection state machine for a single peripheral.
#[derive(Debug, Default, Clone)]
pub struct LinkManager {
    state: ConnectionState,
    has_handle: bool,
}

impl LinkManager {
    /// Create a manager with no handle, in `Disconnected`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current link state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether a connection handle has been allocated.
    pub fn has_handle(&self) -> bool {
        self.has_handle
    }

    /// Issue a connection attempt if the link is down.
    ///
    /// The first attempt allocates a handle ([`Effect::Connect`]); later
    /// attempts reuse it ([`Effect::Reconnect`]). Does nothing while
    /// `Connecting` or `Connected`.
    pub fn ensure_connected(&mut self, effects: &mut Vec<Effect>) {
        if self.state != ConnectionState::Disconnected {
            return;
        }
        if self.has_handle {
            effects.push(Effect::Reconnect);
        } else {
            effects.push(Effect::Connect);
            self.has_handle = true;
        }
        self.state = ConnectionState::Connecting;
    }

    /// Apply a link event and return the previous state.
    pub fn on_link_event(&mut self, event: LinkEvent) -> ConnectionState {
        let previous = self.state;
        self.state = match event {
            LinkEvent::Connected => ConnectionState::Connected,
            LinkEvent::Disconnected => ConnectionState::Disconnected,
        };
        previous
    }

    /// Request teardown of the live connection.
    ///
    /// The handle is kept. The state only changes once the transport reports
    /// the disconnect.
    pub fn disconnect(&mut self, effects: &mut Vec<Effect>) {
        if self.has_handle && self.state != ConnectionState::Disconnected {
            effects.push(Effect::Disconnect);
        }
    }
}
