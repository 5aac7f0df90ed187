//! Platform-agnostic types for SwitchBot Bot actuators.
//!
//! This crate holds the values shared by the controller (`switchbot-core`)
//! and its front ends: the command table and its wire payloads, the
//! peripheral identity, the link state, and the BLE UUID constants.
//!
//! # Example
//!
//! ```
//! use switchbot_types::{Command, PeripheralIdentity};
//!
//! let bot = PeripheralIdentity::new("aa:bb:cc:dd:ee:ff", "Kitchen").unwrap();
//! assert_eq!(bot.address(), "AA:BB:CC:DD:EE:FF");
//! assert_eq!(Command::Press.payload(), [0x57, 0x01, 0x00]);
//! ```

pub mod error;
pub mod types;
pub mod uuid;

pub use error::{ParseError, ParseResult};
pub use types::{Command, ConnectionState, PeripheralIdentity};
pub use uuid as uuids;
