//! Error types for data parsing in radoneye-types.

use thiserror::Error;

/// Errors that can occur when decoding RadonEye responses or selectors.
///
/// This error type is platform-agnostic and does not include
/// BLE-specific errors (those belong in radoneye-core).
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// The response was shorter than the protocol requires.
    #[error("Insufficient bytes: expected at least {expected}, got {actual}")]
    InsufficientBytes { expected: usize, actual: usize },

    /// The response did not echo the command opcode.
    #[error("Unexpected response header: expected 0x{expected:02X}, got 0x{actual:02X}")]
    UnexpectedHeader { expected: u8, actual: u8 },

    /// The protocol selector does not name a known device type.
    #[error("Unknown device type selector: {0}")]
    UnknownDeviceType(u8),

    /// The unit name is not recognised.
    #[error("Unknown unit '{0}' (expected 'bq' or 'pci')")]
    UnknownUnit(String),
}

/// Result type alias using radoneye-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
