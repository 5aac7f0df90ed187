//! Error types for switchbot-core.
//!
//! Command outcomes are never reported through these errors: a command that
//! fails at the link or discovery stage completes through the controller's
//! [`CompletionNotifier`](crate::CompletionNotifier) with `false`. The
//! variants below cover the plumbing around that: building a controller,
//! talking to the Bluetooth stack, and configuration.
//!
//! | Error | Raised by | Retry? |
//! |-------|-----------|--------|
//! | [`Error::TransportUnavailable`] | [`BleTransport::new`](crate::BleTransport::new) | No, the host has no usable adapter |
//! | [`Error::DeviceNotFound`] | transport `connect` | Caller may build a fresh controller |
//! | [`Error::Timeout`] | transport operations | Caller may build a fresh controller |
//! | [`Error::Bluetooth`] | transport operations | Caller may build a fresh controller |
//! | [`Error::ControllerClosed`] | `BotController::press` and friends | No |
//! | [`Error::InvalidConfig`] | config `validate()` | Fix the configuration |

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur around a SwitchBot controller.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Bluetooth Low Energy error.
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),

    /// The host has no usable Bluetooth subsystem.
    #[error("Bluetooth transport unavailable: {0}")]
    TransportUnavailable(String),

    /// No peripheral with the requested address is known to the adapter.
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// Operation attempted without a connection handle.
    #[error("Not connected to device")]
    NotConnected,

    /// The control characteristic is not exposed by the peripheral.
    #[error("Characteristic not found: {uuid} (searched in {service_count} services)")]
    CharacteristicNotFound {
        /// The UUID that was not found.
        uuid: String,
        /// Number of services that were searched.
        service_count: usize,
    },

    /// Operation timed out.
    #[error("Operation '{operation}' timed out after {duration:?}")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// The timeout duration.
        duration: Duration,
    },

    /// The controller task has stopped and no longer accepts commands.
    #[error("Controller is closed")]
    ControllerClosed,

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Create a device not found error for a specific address.
    pub fn device_not_found(address: impl Into<String>) -> Self {
        Self::DeviceNotFound(address.into())
    }

    /// Create a timeout error with operation context.
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a characteristic not found error.
    pub fn characteristic_not_found(uuid: impl Into<String>, service_count: usize) -> Self {
        Self::CharacteristicNotFound {
            uuid: uuid.into(),
            service_count,
        }
    }

    /// Create a configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }
}

/// Result type alias using switchbot-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;
