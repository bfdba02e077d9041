//! Trait abstraction over the wireless read of one device.
//!
//! [`DeviceLink`] is the seam between the polling scheduler and the
//! Bluetooth stack. [`BleLink`](crate::ble::BleLink) talks to real hardware;
//! [`MockLink`](crate::mock::MockLink) is scripted for tests.

use std::sync::Arc;

use async_trait::async_trait;

use radoneye_types::{DeviceType, DualReading};

use crate::error::Result;

/// Performs one read of a single device.
///
/// Implementations must bound their own latency (every BLE await in
/// [`BleLink`](crate::ble::BleLink) is wrapped in a timeout). A failure is
/// returned as an [`Error`](crate::Error) value; the caller decides whether
/// to retry.
///
/// # Example
///
/// ```ignore
/// use radoneye_core::{DeviceLink, Result};
/// use radoneye_types::{DeviceType, Unit};
///
/// async fn print_reading<L: DeviceLink>(link: &L) -> Result<()> {
///     let reading = link.read("AA:BB:CC:DD:EE:FF", DeviceType::Rd200V2).await?;
///     println!("{} {}", reading.value(Unit::Becquerel), Unit::Becquerel);
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait DeviceLink: Send + Sync {
    /// Read the current radon value of `address` using the `device_type` protocol.
    async fn read(&self, address: &str, device_type: DeviceType) -> Result<DualReading>;
}

#[async_trait]
impl<L: DeviceLink + ?Sized> DeviceLink for Arc<L> {
    async fn read(&self, address: &str, device_type: DeviceType) -> Result<DualReading> {
        (**self).read(address, device_type).await
    }
}
