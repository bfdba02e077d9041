//! Platform-agnostic types for RadonEye RD200 radon detectors.
//!
//! This crate holds the pieces that do not need a Bluetooth stack:
//!
//! - [`DeviceType`], the per-device decode protocol selector
//! - [`Unit`] and [`DualReading`] for the two radon units
//! - Byte decoders for both RD200 firmware generations
//! - UUID constants for the RD200 GATT layout
//!
//! # Example
//!
//! ```
//! use radoneye_types::{DeviceType, DualReading, Unit};
//!
//! let mut response = vec![0x50, 0x0A];
//! response.extend_from_slice(&2.0f32.to_le_bytes());
//!
//! let reading = DualReading::from_bytes(DeviceType::Rd200, &response).unwrap();
//! assert_eq!(reading.value(Unit::Becquerel), 74.0);
//! ```

pub mod error;
pub mod types;
pub mod uuid;

pub use error::{ParseError, ParseResult};
pub use types::{BQ_PER_PCI, DeviceType, DualReading, Unit, round2};
pub use uuid as uuids;
