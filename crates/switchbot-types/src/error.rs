//! Error types for value parsing in switchbot-types.

use thiserror::Error;

/// Errors that can occur when parsing SwitchBot values from user input.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// The word does not name a known command.
    #[error("Unknown command '{0}' (expected press, on or off)")]
    UnknownCommand(String),

    /// The string is neither a MAC address nor a peripheral UUID.
    #[error("Invalid device address '{0}'")]
    InvalidAddress(String),
}

/// Result type alias using switchbot-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
