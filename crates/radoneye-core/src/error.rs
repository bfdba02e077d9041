//! Error types for radoneye-core.
//!
//! Every failure of a single acquisition (transport, decode, or an
//! implausible value) is an [`Error`] value. The polling scheduler treats all
//! of them the same way: log, retry within the per-round budget, then move
//! on. [`Error::UnknownDevice`] is the exception; it means the caller asked
//! about an address that was never registered.

use std::time::Duration;

use thiserror::Error;

use radoneye_types::ParseError;

/// Errors that can occur when reading RadonEye devices.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Bluetooth Low Energy error.
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),

    /// No Bluetooth adapter is available on this host.
    #[error("No Bluetooth adapter available")]
    NoAdapter,

    /// Device did not show up during the scan window.
    #[error("Device '{0}' not found")]
    DeviceNotFound(String),

    /// Required BLE characteristic not found on device.
    #[error("Characteristic not found: {uuid}")]
    CharacteristicNotFound {
        /// The UUID that was not found.
        uuid: String,
    },

    /// Operation timed out.
    #[error("Operation '{operation}' timed out after {duration:?}")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// The timeout duration.
        duration: Duration,
    },

    /// The device answered with bytes that could not be decoded.
    #[error("Decode error: {0}")]
    Parse(#[from] ParseError),

    /// The decoded value is outside the plausible range.
    #[error("Implausible radon value {value} Bq/m³ (accepted range {min}..={max})")]
    OutOfRange {
        /// The rejected Bq/m³ value.
        value: f64,
        /// Inclusive lower bound.
        min: f64,
        /// Inclusive upper bound.
        max: f64,
    },

    /// An address that was never registered was looked up.
    #[error("Device '{0}' is not registered")]
    UnknownDevice(String),

    /// Failure injected by a test double.
    #[error("{0}")]
    Mock(String),
}

impl Error {
    /// Create a timeout error with operation context.
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a characteristic not found error.
    pub fn characteristic_not_found(uuid: impl ToString) -> Self {
        Self::CharacteristicNotFound {
            uuid: uuid.to_string(),
        }
    }
}

/// Result type alias using radoneye-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;
