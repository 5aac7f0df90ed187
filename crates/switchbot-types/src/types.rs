//! Core types for SwitchBot Bot control.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// A command the Bot can execute.
///
/// Each variant maps to a fixed 3-byte payload written to the control
/// characteristic: `[MAGIC, ACTION, argument]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[repr(u8)]
pub enum Command {
    /// Press and release the arm.
    Press = 0x00,
    /// Switch mode: move the arm to the "on" position.
    TurnOn = 0x01,
    /// Switch mode: move the arm to the "off" position.
    TurnOff = 0x02,
}

impl Command {
    /// Leading byte of every SwitchBot request.
    pub const MAGIC: u8 = 0x57;

    /// Request type for arm actions.
    pub const ACTION: u8 = 0x01;

    /// All commands, in payload order.
    pub const ALL: [Command; 3] = [Command::Press, Command::TurnOn, Command::TurnOff];

    /// The exact bytes written to the control characteristic.
    ///
    /// # Examples
    ///
    /// ```
    /// use switchbot_types::Command;
    ///
    /// assert_eq!(Command::Press.payload(), [0x57, 0x01, 0x00]);
    /// assert_eq!(Command::TurnOn.payload(), [0x57, 0x01, 0x01]);
    /// assert_eq!(Command::TurnOff.payload(), [0x57, 0x01, 0x02]);
    /// ```
    #[must_use]
    pub const fn payload(self) -> [u8; 3] {
        [Self::MAGIC, Self::ACTION, self as u8]
    }

    /// Lower-case word used on the command line and in log lines.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Command::Press => "press",
            Command::TurnOn => "on",
            Command::TurnOff => "off",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Command {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "press" => Ok(Command::Press),
            "on" | "turn-on" | "turn_on" => Ok(Command::TurnOn),
            "off" | "turn-off" | "turn_off" => Ok(Command::TurnOff),
            _ => Err(ParseError::UnknownCommand(s.to_string())),
        }
    }
}

/// Link state of one controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ConnectionState {
    /// No connection, and no attempt in flight.
    #[default]
    Disconnected,
    /// A connection attempt has been issued.
    Connecting,
    /// The link is up and usable for writes.
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        };
        f.write_str(s)
    }
}

/// The peripheral a controller talks to.
///
/// The address is what the connection layer uses; the display name is a
/// user label and never reaches the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct PeripheralIdentity {
    address: String,
    display_name: String,
}

impl PeripheralIdentity {
    /// Create an identity, validating and normalizing the address.
    ///
    /// MAC addresses (`AA:BB:CC:DD:EE:FF` or `AA-BB-CC-DD-EE-FF`) are
    /// normalized to upper case with colons. Peripheral UUIDs, which is how
    /// CoreBluetooth identifies devices, are normalized to the hyphenated
    /// lower-case form.
    ///
    /// # Examples
    ///
    /// ```
    /// use switchbot_types::PeripheralIdentity;
    ///
    /// let id = PeripheralIdentity::new("aa-bb-cc-dd-ee-ff", "Desk lamp").unwrap();
    /// assert_eq!(id.address(), "AA:BB:CC:DD:EE:FF");
    /// assert_eq!(id.display_name(), "Desk lamp");
    ///
    /// assert!(PeripheralIdentity::new("not-an-address", "x").is_err());
    /// ```
    pub fn new(address: &str, display_name: impl Into<String>) -> Result<Self, ParseError> {
        Ok(Self {
            address: normalize_address(address)?,
            display_name: display_name.into(),
        })
    }

    /// Create an identity whose display name is the address itself.
    pub fn from_address(address: &str) -> Result<Self, ParseError> {
        let address = normalize_address(address)?;
        Ok(Self {
            display_name: address.clone(),
            address,
        })
    }

    /// Connection-layer identifier.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// User-facing label.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Whether the address is a MAC address rather than a peripheral UUID.
    pub fn is_mac_address(&self) -> bool {
        self.address.len() == 17 && self.address.contains(':')
    }
}

impl fmt::Display for PeripheralIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.display_name == self.address {
            write!(f, "{}", self.address)
        } else {
            write!(f, "{} ({})", self.display_name, self.address)
        }
    }
}

fn normalize_address(input: &str) -> Result<String, ParseError> {
    let trimmed = input.trim();
    let invalid = || ParseError::InvalidAddress(input.to_string());

    let octets: Vec<&str> = trimmed.split([':', '-']).collect();
    if octets.len() == 6 {
        if octets
            .iter()
            .all(|o| o.len() == 2 && o.chars().all(|c| c.is_ascii_hexdigit()))
        {
            return Ok(octets.join(":").to_ascii_uppercase());
        }
        return Err(invalid());
    }

    match uuid::Uuid::parse_str(trimmed) {
        Ok(id) => Ok(id.hyphenated().to_string()),
        Err(_) => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_table() {
        assert_eq!(Command::Press.payload(), [0x57, 0x01, 0x00]);
        assert_eq!(Command::TurnOn.payload(), [0x57, 0x01, 0x01]);
        assert_eq!(Command::TurnOff.payload(), [0x57, 0x01, 0x02]);
    }

    #[test]
    fn test_payloads_are_distinct() {
        let mut last_bytes: Vec<u8> = Command::ALL.iter().map(|c| c.payload()[2]).collect();
        last_bytes.dedup();
        assert_eq!(last_bytes.len(), 3);
    }

    #[test]
    fn test_command_from_str() {
        assert_eq!("press".parse::<Command>(), Ok(Command::Press));
        assert_eq!("ON".parse::<Command>(), Ok(Command::TurnOn));
        assert_eq!("turn-off".parse::<Command>(), Ok(Command::TurnOff));
        assert_eq!(
            "toggle".parse::<Command>(),
            Err(ParseError::UnknownCommand("toggle".to_string()))
        );
    }

    #[test]
    fn test_command_display_round_trips_through_parse() {
        for cmd in Command::ALL {
            assert_eq!(cmd.to_string().parse::<Command>(), Ok(cmd));
        }
    }

    #[test]
    fn test_connection_state_default() {
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
        assert_eq!(ConnectionState::Connecting.to_string(), "connecting");
    }

    #[test]
    fn test_identity_normalizes_mac() {
        let id = PeripheralIdentity::new(" aa:bb:cc:dd:ee:ff ", "Bot").unwrap();
        assert_eq!(id.address(), "AA:BB:CC:DD:EE:FF");
        assert!(id.is_mac_address());
        assert_eq!(id.to_string(), "Bot (AA:BB:CC:DD:EE:FF)");
    }

    #[test]
    fn test_identity_accepts_peripheral_uuid() {
        let id = PeripheralIdentity::from_address("12345678123412341234123456789ABC").unwrap();
        assert_eq!(id.address(), "12345678-1234-1234-1234-123456789abc");
        assert!(!id.is_mac_address());
        assert_eq!(id.display_name(), id.address());
    }

    #[test]
    fn test_identity_rejects_garbage() {
        for bad in ["", "AA:BB:CC", "GG:BB:CC:DD:EE:FF", "AAA:BB:CC:DD:EE:F", "kitchen"] {
            assert!(
                matches!(
                    PeripheralIdentity::from_address(bad),
                    Err(ParseError::InvalidAddress(_))
                ),
                "accepted {bad:?}"
            );
        }
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_command_serde_names() {
        let json = serde_json::to_string(&Command::TurnOn).unwrap();
        assert_eq!(json, "\"turn_on\"");
        let back: Command = serde_json::from_str("\"press\"").unwrap();
        assert_eq!(back, Command::Press);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn any_mac_octets_normalize(bytes in proptest::array::uniform6(any::<u8>())) {
                let raw = bytes
                    .iter()
                    .map(|b| format!("{b:02x}"))
                    .collect::<Vec<_>>()
                    .join("-");
                let id = PeripheralIdentity::from_address(&raw).unwrap();
                prop_assert_eq!(id.address(), raw.replace('-', ":").to_ascii_uppercase());
            }
        }
    }
}
