//! Connection and command controller for SwitchBot Bot actuators.
//!
//! A SwitchBot Bot is a small BLE finger that presses a physical button or
//! flips a switch. Driving one takes a short, fixed conversation: connect,
//! find the control characteristic, write a three-byte command, wait a few
//! seconds for the arm to move, disconnect. This crate runs that
//! conversation for one peripheral at a time.
//!
//! # Layers
//!
//! - [`StateMachine`]: pure and synchronous. Feed it an [`Input`], get back
//!   the new link state and a list of [`Effect`]s. No I/O, no clocks.
//! - [`BotController`]: a tokio task that owns a machine, carries out its
//!   effects against a [`Transport`], runs the post-write timer, and reports
//!   the outcome once through a [`CompletionNotifier`].
//! - [`Transport`]: the Bluetooth seam. [`BleTransport`] uses btleplug,
//!   [`MockTransport`] records calls for tests.
//! - [`LogSink`]: short human-readable status lines, separate from
//!   `tracing` diagnostics. [`FileLog`] appends `"MM-dd HH:mm message"`.
//!
//! # Platform Differences
//!
//! - **Linux/Windows**: peripherals are addressed by MAC (`AA:BB:CC:DD:EE:FF`).
//! - **macOS**: CoreBluetooth hides MAC addresses; use the peripheral UUID
//!   it assigns instead.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use switchbot_core::{BleTransport, BotController, CompletionNotifier, FileLog};
//! use switchbot_types::PeripheralIdentity;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let identity = PeripheralIdentity::new("AA:BB:CC:DD:EE:FF", "Kitchen")?;
//!     let (transport, events) = BleTransport::new(identity.clone()).await?;
//!     let (notifier, done) = CompletionNotifier::channel();
//!
//!     let controller = BotController::new(
//!         identity,
//!         Arc::new(transport),
//!         events,
//!         Arc::new(FileLog::open_default()),
//!         notifier,
//!     )?;
//!     controller.press()?;
//!
//!     println!("success: {}", done.await.unwrap_or(false));
//!     Ok(())
//! }
//! ```

pub mod ble;
pub mod controller;
pub mod error;
pub mod events;
pub mod executor;
pub mod link;
pub mod log;
pub mod machine;
pub mod mock;
pub mod resolver;
pub mod transport;
pub mod util;

pub use switchbot_types::types;
pub use switchbot_types::uuid;

pub use ble::{BleTransport, TransportConfig};
pub use controller::{BotController, CompletionNotifier, ControllerConfig};
pub use error::{Error, Result};
pub use events::{
    ControlCapability, Effect, EventReceiver, EventSender, GattStatus, Input, LinkEvent,
    ServiceInfo, TransportEvent, event_channel,
};
pub use executor::{CommandExecutor, DISCONNECT_DELAY};
pub use link::LinkManager;
pub use log::{FileLog, LogSink, MemoryLog, NullLog, default_log_path};
pub use machine::{StateMachine, Transition};
pub use mock::{MockOperation, MockTransport, MockTransportBuilder, TransportCall};
pub use resolver::{CapabilityResolver, ResolveError};
pub use transport::Transport;
