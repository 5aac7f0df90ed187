//! Bluetooth UUIDs for SwitchBot Bot devices.
//!
//! See the vendor's BLE notes for the Bot device type; only the command
//! characteristic is used by the controller.

use uuid::{Uuid, uuid};

/// SwitchBot communication service.
pub const COMMUNICATION_SERVICE: Uuid = uuid!("cba20d00-224d-11e6-9fb8-0002a5d5c51b");

/// Control characteristic that accepts command bytes.
pub const SEND_COMMAND: Uuid = uuid!("cba20002-224d-11e6-9fb8-0002a5d5c51b");

/// Characteristic carrying command responses as notifications.
///
/// The controller does not subscribe to it: the Bot acts on the write alone.
pub const COMMAND_RESPONSE: Uuid = uuid!("cba20003-224d-11e6-9fb8-0002a5d5c51b");
