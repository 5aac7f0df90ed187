//! Helpers for matching btleplug peripherals against a configured address.

use btleplug::platform::PeripheralId;

/// Address reported by CoreBluetooth, which hides real MAC addresses.
const HIDDEN_ADDRESS: &str = "00:00:00:00:00:00";

/// Format a peripheral ID as a string.
///
/// On macOS, peripheral IDs are UUIDs. On other platforms they wrap the
/// Bluetooth address.
pub fn format_peripheral_id(id: &PeripheralId) -> String {
    format!("{:?}", id)
        .trim_start_matches("PeripheralId(")
        .trim_end_matches(')')
        .to_string()
}

/// Whether a peripheral is the one at `wanted`.
///
/// `wanted` is a normalized address (see
/// [`PeripheralIdentity`](switchbot_types::PeripheralIdentity)). MAC
/// addresses are compared against the reported address, ignoring case and
/// separators; anything else is compared against the formatted peripheral ID.
pub fn matches_address(wanted: &str, reported_address: &str, peripheral_id: &str) -> bool {
    let wanted = compact(wanted);
    if wanted.is_empty() {
        return false;
    }
    if reported_address != HIDDEN_ADDRESS && compact(reported_address) == wanted {
        return true;
    }
    compact(peripheral_id) == wanted
}

fn compact(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
