//! Events delivered by the transport and effects requested by the controller.
//!
//! The state machine consumes [`Input`]s and answers with [`Effect`]s. The
//! transport reports completions as [`TransportEvent`]s on an unbounded
//! channel, in the order the Bluetooth stack delivers them.

use std::fmt;
use std::time::Duration;

use tokio::sync::mpsc;
use uuid::Uuid;

use switchbot_types::Command;

/// Status code attached to discovery and write completions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GattStatus(pub u8);

impl GattStatus {
    /// Operation completed.
    pub const SUCCESS: GattStatus = GattStatus(0x00);
    /// Generic failure, used when a transport call errors out.
    pub const FAILURE: GattStatus = GattStatus(0x85);

    /// Whether this is the success status.
    pub fn is_success(self) -> bool {
        self == Self::SUCCESS
    }
}

impl fmt::Display for GattStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle to the writable control endpoint found during discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControlCapability {
    /// Service that exposes the characteristic.
    pub service: Uuid,
    /// The control characteristic itself.
    pub characteristic: Uuid,
}

/// One service from a discovery result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInfo {
    /// Service UUID.
    pub uuid: Uuid,
    /// Characteristic UUIDs exposed by the service.
    pub characteristics: Vec<Uuid>,
}

impl ServiceInfo {
    /// Create a service entry.
    pub fn new(uuid: Uuid, characteristics: impl IntoIterator<Item = Uuid>) -> Self {
        Self {
            uuid,
            characteristics: characteristics.into_iter().collect(),
        }
    }
}

/// Link-layer transition reported by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    /// The connection is established.
    Connected,
    /// The connection is gone (or never came up).
    Disconnected,
}

/// Asynchronous completions from the Bluetooth stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The link changed state.
    ConnectionStateChanged(LinkEvent),
    /// Service discovery finished.
    ServicesDiscovered {
        /// Discovery status.
        status: GattStatus,
        /// Services found, in the order the stack reported them.
        services: Vec<ServiceInfo>,
    },
    /// A characteristic write was acknowledged.
    CharacteristicWriteComplete {
        /// Write status as reported by the stack.
        status: GattStatus,
    },
}

/// Everything that can drive the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// The caller asked for a command.
    Schedule(Command),
    /// The transport reported a completion.
    Transport(TransportEvent),
    /// The post-write grace period elapsed.
    DisconnectTimerElapsed,
}

impl From<TransportEvent> for Input {
    fn from(event: TransportEvent) -> Self {
        Input::Transport(event)
    }
}

/// Side effects requested by the state machine, in execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Open a new connection.
    Connect,
    /// Reconnect using the existing connection handle.
    Reconnect,
    /// Enumerate services on the connected peripheral.
    DiscoverServices,
    /// Write a payload to the control characteristic.
    Write {
        /// Target characteristic.
        capability: ControlCapability,
        /// Bytes to write.
        payload: [u8; 3],
    },
    /// Start the delayed-disconnect timer.
    ArmDisconnectTimer(Duration),
    /// Tear the connection down, keeping the handle.
    Disconnect,
    /// Report the command outcome to the caller.
    Complete {
        /// Whether the command succeeded.
        success: bool,
    },
    /// Append a line to the status log.
    Log(String),
}

/// Sender half used by transports to report events.
pub type EventSender = mpsc::UnboundedSender<TransportEvent>;

/// Receiver half consumed by the controller.
pub type EventReceiver = mpsc::UnboundedReceiver<TransportEvent>;

/// Create a new transport event channel.
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
