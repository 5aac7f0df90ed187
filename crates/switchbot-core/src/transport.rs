//! Trait abstraction for the Bluetooth stack the controller drives.
//!
//! A transport executes link-layer requests and reports how they finished
//! as [`TransportEvent`](crate::events::TransportEvent)s on the
//! [`EventSender`](crate::events::EventSender) it was built with. Returning
//! `Ok(())` only means the request was issued; returning `Err` means no
//! event will follow, and the controller substitutes the matching failure
//! event itself.

use async_trait::async_trait;

use crate::error::Result;
use crate::events::ControlCapability;

/// Link-layer primitives used by [`BotController`](crate::BotController).
///
/// Implemented by [`BleTransport`](crate::BleTransport) for real hardware
/// and [`MockTransport`](crate::MockTransport) for tests.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open a new connection to the peripheral.
    ///
    /// Reports `ConnectionStateChanged(Connected)` once the link is up.
    async fn connect(&self) -> Result<()>;

    /// Reconnect through the handle allocated by an earlier [`connect`](Self::connect).
    async fn reconnect(&self) -> Result<()>;

    /// Tear the link down. The handle stays usable for [`reconnect`](Self::reconnect).
    ///
    /// Reports `ConnectionStateChanged(Disconnected)`.
    async fn disconnect(&self) -> Result<()>;

    /// Enumerate services. Reports `ServicesDiscovered`.
    async fn discover_services(&self) -> Result<()>;

    /// Write `payload` to the capability. Reports `CharacteristicWriteComplete`.
    async fn write(&self, capability: ControlCapability, payload: [u8; 3]) -> Result<()>;
}
