//! Acquisition library for RadonEye RD200 radon detectors.
//!
//! This crate reads radon concentrations from RD200 detectors over Bluetooth
//! Low Energy and keeps a short rolling history per device.
//!
//! # Features
//!
//! - **Device link**: [`DeviceLink`] trait with a BLE implementation ([`BleLink`])
//!   and a scripted one for tests ([`MockLink`])
//! - **Validation**: readings outside 0..=1000 Bq/m³ are rejected
//! - **Reading windows**: the last [`WINDOW_CAPACITY`] readings per device
//! - **Polling**: [`PollScheduler`] retries each device a few times per round
//!   and pauses between rounds
//!
//! # Device identification
//!
//! On Linux and Windows a device is addressed by its Bluetooth MAC address
//! (`AA:BB:CC:DD:EE:FF`). On macOS CoreBluetooth hides MAC addresses, so the
//! peripheral UUID is used instead. Addresses compare case-insensitively.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use radoneye_core::{
//!     BleConfig, BleLink, DeviceRegistration, PollConfig, PollScheduler, Registry, WindowStore,
//! };
//! use radoneye_types::DeviceType;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = Arc::new(Registry::new(vec![DeviceRegistration::new(
//!         "AA:BB:CC:DD:EE:FF",
//!         "Bedroom",
//!         DeviceType::Rd200V2,
//!     )])?);
//!     let windows = Arc::new(WindowStore::new(&registry));
//!     let link = BleLink::new(BleConfig::default()).await?;
//!
//!     let scheduler = PollScheduler::new(
//!         Arc::clone(&registry),
//!         Arc::clone(&windows),
//!         link,
//!         PollConfig::default(),
//!     );
//!     scheduler.run_round(0).await;
//!
//!     println!("{} pCi/L", windows.current("AA:BB:CC:DD:EE:FF")?);
//!     Ok(())
//! }
//! ```

pub mod ble;
pub mod error;
pub mod link;
pub mod mock;
pub mod registry;
pub mod scheduler;
pub mod validation;
pub mod window;

pub use ble::{BleConfig, BleLink};
pub use error::{Error, Result};
pub use link::DeviceLink;
pub use mock::MockLink;
pub use registry::{DeviceRegistration, Registry, RegistryError};
pub use scheduler::{
    AcquireOutcome, DeviceStats, PollConfig, PollScheduler, PollStats, RoundSummary,
};
pub use validation::{MAX_PLAUSIBLE_BQ, MIN_PLAUSIBLE_BQ, validate};
pub use window::{ReadingWindow, WINDOW_CAPACITY, WindowStore, WindowSummary};

// Re-export from radoneye-types
pub use radoneye_types::uuid as uuids;
pub use radoneye_types::{DeviceType, DualReading, Unit};
