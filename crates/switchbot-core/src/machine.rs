//! The connection-and-command state machine.
//!
//! [`StateMachine::handle`] is the only place controller state changes. It
//! performs no I/O: every consequence of an input comes back as a list of
//! [`Effect`]s for the runner (or a test) to carry out in order.
//!
//! ```text
//!  press()/turn_on()/turn_off()
//!          │ Schedule
//!          ▼
//!   Disconnected ──Connect/Reconnect──► Connecting ──Connected──► Connected
//!          ▲                                 │                     │
//!          └──────────── Disconnected ◄──────┴─────────────────────┘
//!
//!   Connected, capability unknown  → DiscoverServices → Write
//!   Connected, capability cached   → Write
//!   write acknowledged             → ArmDisconnectTimer(3 s)
//!   timer elapsed                  → Complete(true), Disconnect
//!   Disconnected with pending cmd  → Complete(false)
//! ```

use std::time::Duration;

use tracing::{debug, info, warn};

use switchbot_types::{Command, ConnectionState, PeripheralIdentity};

use crate::events::{
    ControlCapability, Effect, GattStatus, Input, LinkEvent, ServiceInfo, TransportEvent,
};
use crate::executor::CommandExecutor;
use crate::link::LinkManager;
use crate::resolver::CapabilityResolver;

/// Result of feeding one input to the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// Link state after the input.
    pub state: ConnectionState,
    /// Effects to carry out, in order.
    pub effects: Vec<Effect>,
}

/// Link manager, capability resolver and command executor for one peripheral.
#[derive(Debug, Clone)]
pub struct StateMachine {
    identity: PeripheralIdentity,
    link: LinkManager,
    resolver: CapabilityResolver,
    executor: CommandExecutor,
}

impl StateMachine {
    /// Create a machine with the default control characteristic.
    pub fn new(identity: PeripheralIdentity, disconnect_delay: Duration) -> Self {
        Self::with_resolver(identity, disconnect_delay, CapabilityResolver::default())
    }

    /// Create a machine with a custom resolver.
    pub fn with_resolver(
        identity: PeripheralIdentity,
        disconnect_delay: Duration,
        resolver: CapabilityResolver,
    ) -> Self {
        Self {
            identity,
            link: LinkManager::new(),
            resolver,
            executor: CommandExecutor::new(disconnect_delay),
        }
    }

    /// The peripheral this machine is bound to.
    pub fn identity(&self) -> &PeripheralIdentity {
        &self.identity
    }

    /// Current link state.
    pub fn state(&self) -> ConnectionState {
        self.link.state()
    }

    /// The cached control capability.
    pub fn capability(&self) -> Option<ControlCapability> {
        self.resolver.capability()
    }

    /// The command waiting to be written.
    pub fn pending(&self) -> Option<Command> {
        self.executor.pending()
    }

    /// Whether the completion has been reported.
    pub fn is_completed(&self) -> bool {
        self.executor.is_completed()
    }

    /// Feed one input and collect the resulting effects.
    pub fn handle(&mut self, input: Input) -> Transition {
        let mut effects = Vec::new();
        match input {
            Input::Schedule(command) => self.schedule_command(command, &mut effects),
            Input::Transport(TransportEvent::ConnectionStateChanged(event)) => {
                self.on_connection_event(event, &mut effects)
            }
            Input::Transport(TransportEvent::ServicesDiscovered { status, services }) => {
                self.on_services_discovered(status, &services, &mut effects)
            }
            Input::Transport(TransportEvent::CharacteristicWriteComplete { status }) => {
                self.on_write_acknowledged(status, &mut effects)
            }
            Input::DisconnectTimerElapsed => self.on_disconnect_timer(&mut effects),
        }
        Transition {
            state: self.link.state(),
            effects,
        }
    }

    fn schedule_command(&mut self, command: Command, effects: &mut Vec<Effect>) {
        debug!(%command, state = %self.link.state(), "Scheduling command");
        self.executor.schedule(command);

        match self.link.state() {
            ConnectionState::Connected => {
                // Without a capability, discovery is in flight and will pick
                // the command up when it completes.
                self.execute_pending(effects);
            }
            ConnectionState::Disconnected => self.link.ensure_connected(effects),
            ConnectionState::Connecting => {}
        }
    }

    fn on_connection_event(&mut self, event: LinkEvent, effects: &mut Vec<Effect>) {
        let previous = self.link.on_link_event(event);
        info!(
            "Connection state of '{}': {} -> {}",
            self.identity.display_name(),
            previous,
            self.link.state()
        );

        match event {
            LinkEvent::Connected => {
                if previous == ConnectionState::Connected {
                    return;
                }
                if self.resolver.is_resolved() {
                    self.execute_pending(effects);
                } else {
                    effects.push(Effect::DiscoverServices);
                }
            }
            LinkEvent::Disconnected => {
                if let Some(command) = self.executor.take_pending() {
                    warn!(
                        %command,
                        "Link to '{}' dropped before the command completed",
                        self.identity.display_name()
                    );
                    self.executor.trigger_callback(false, effects);
                }
            }
        }
    }

    fn on_services_discovered(
        &mut self,
        status: GattStatus,
        services: &[ServiceInfo],
        effects: &mut Vec<Effect>,
    ) {
        if self.link.state() != ConnectionState::Connected || self.resolver.is_resolved() {
            debug!(%status, "Ignoring discovery result");
            return;
        }

        match self.resolver.resolve(status, services) {
            Ok(capability) => {
                info!(
                    "Got control characteristic of '{}' in service {}",
                    self.identity.display_name(),
                    capability.service
                );
                self.execute_pending(effects);
            }
            Err(e) => {
                warn!("Discovery on '{}' failed: {}", self.identity.display_name(), e);
                effects.push(Effect::Log(format!(
                    "discovery failed for '{}': {}",
                    self.identity.display_name(),
                    e
                )));
                self.executor.take_pending();
                self.executor.trigger_callback(false, effects);
                self.link.disconnect(effects);
            }
        }
    }

    fn on_write_acknowledged(&mut self, status: GattStatus, effects: &mut Vec<Effect>) {
        info!(
            "Command to '{}' acknowledged, status: {}",
            self.identity.display_name(),
            status
        );
        effects.push(Effect::Log(format!(
            "command sent to '{}', status: {}",
            self.identity.display_name(),
            status
        )));
        self.executor.on_write_acknowledged(effects);
    }

    fn on_disconnect_timer(&mut self, effects: &mut Vec<Effect>) {
        self.executor.on_timer_elapsed(effects);
        info!("Disconnecting from '{}'", self.identity.display_name());
        self.link.disconnect(effects);
    }

    fn execute_pending(&mut self, effects: &mut Vec<Effect>) {
        let written = self
            .executor
            .execute(self.link.state(), self.resolver.capability(), effects);
        if written {
            info!("Sent command to '{}'", self.identity.display_name());
        }
    }
}
