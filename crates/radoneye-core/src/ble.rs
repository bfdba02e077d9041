//! Bluetooth Low Energy implementation of [`DeviceLink`].
//!
//! Each read is a full session: find the peripheral, connect, discover
//! services, send the protocol's read command, wait for the answer, and
//! disconnect. RD200 detectors accept a single central at a time, so holding
//! connections open between rounds would lock out the vendor's phone app.
//!
//! Every BLE await is bounded by a timeout from [`BleConfig`].

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{
    Central, CharPropFlags, Characteristic, Manager as _, Peripheral as _, ScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use futures::StreamExt;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};
use uuid::Uuid;

use radoneye_types::{DeviceType, DualReading};

use crate::error::{Error, Result};
use crate::link::DeviceLink;

/// Timeouts for one BLE read session.
#[derive(Debug, Clone)]
pub struct BleConfig {
    /// How long to scan when the peripheral is not yet known to the adapter.
    pub scan_duration: Duration,
    /// Timeout for connecting and for service discovery.
    pub connect_timeout: Duration,
    /// Timeout for the command/response exchange.
    pub read_timeout: Duration,
}

impl Default for BleConfig {
    fn default() -> Self {
        Self {
            scan_duration: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(15),
            read_timeout: Duration::from_secs(10),
        }
    }
}

impl BleConfig {
    #[must_use]
    pub fn scan_duration(mut self, duration: Duration) -> Self {
        self.scan_duration = duration;
        self
    }

    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }
}

/// [`DeviceLink`] backed by the host's first Bluetooth adapter.
pub struct BleLink {
    adapter: Adapter,
    config: BleConfig,
}

impl std::fmt::Debug for BleLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BleLink")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl BleLink {
    /// Open the first available adapter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoAdapter`] when the host has no Bluetooth adapter.
    pub async fn new(config: BleConfig) -> Result<Self> {
        let manager = Manager::new().await?;
        let adapter = manager
            .adapters()
            .await?
            .into_iter()
            .next()
            .ok_or(Error::NoAdapter)?;
        Ok(Self { adapter, config })
    }

    /// Locate `address` among known peripherals, scanning once if needed.
    async fn find_peripheral(&self, address: &str) -> Result<Peripheral> {
        if let Some(peripheral) = self.known_peripheral(address).await? {
            return Ok(peripheral);
        }

        debug!(
            "{} not cached, scanning for {}s",
            address,
            self.config.scan_duration.as_secs()
        );
        self.adapter.start_scan(ScanFilter::default()).await?;
        sleep(self.config.scan_duration).await;
        self.adapter.stop_scan().await?;

        self.known_peripheral(address)
            .await?
            .ok_or_else(|| Error::DeviceNotFound(address.to_string()))
    }

    async fn known_peripheral(&self, address: &str) -> Result<Option<Peripheral>> {
        for peripheral in self.adapter.peripherals().await? {
            if format_peripheral_id(&peripheral.id()).eq_ignore_ascii_case(address) {
                return Ok(Some(peripheral));
            }
            if let Ok(Some(props)) = peripheral.properties().await
                && props.address.to_string().eq_ignore_ascii_case(address)
            {
                return Ok(Some(peripheral));
            }
        }
        Ok(None)
    }

    /// Send the read command and collect the raw response.
    async fn exchange(&self, peripheral: &Peripheral, device_type: DeviceType) -> Result<Vec<u8>> {
        bounded(
            self.config.connect_timeout,
            "discover services",
            peripheral.discover_services(),
        )
        .await?;

        let command = find_characteristic(peripheral, device_type.command_uuid())?;
        let response = find_characteristic(peripheral, device_type.response_uuid())?;
        let opcode = device_type.read_command();

        if response.properties.contains(CharPropFlags::NOTIFY) {
            bounded(
                self.config.read_timeout,
                "subscribe",
                peripheral.subscribe(&response),
            )
            .await?;
            // Take the stream before writing so the reply cannot be missed.
            let mut notifications = peripheral.notifications().await?;
            self.write_command(peripheral, &command, opcode).await?;

            let wait = async {
                while let Some(notification) = notifications.next().await {
                    if notification.uuid == response.uuid
                        && notification.value.first() == Some(&opcode)
                    {
                        return Some(notification.value);
                    }
                }
                None
            };
            if let Ok(Some(value)) = timeout(self.config.read_timeout, wait).await {
                return Ok(value);
            }
            debug!("No notification received, falling back to a direct read");
        } else {
            self.write_command(peripheral, &command, opcode).await?;
        }

        bounded(
            self.config.read_timeout,
            "read response",
            peripheral.read(&response),
        )
        .await
    }

    async fn write_command(
        &self,
        peripheral: &Peripheral,
        command: &Characteristic,
        opcode: u8,
    ) -> Result<()> {
        bounded(
            self.config.read_timeout,
            "write command",
            peripheral.write(command, &[opcode], WriteType::WithResponse),
        )
        .await
    }
}

#[async_trait]
impl DeviceLink for BleLink {
    #[tracing::instrument(level = "debug", skip(self))]
    async fn read(&self, address: &str, device_type: DeviceType) -> Result<DualReading> {
        let peripheral = self.find_peripheral(address).await?;

        bounded(
            self.config.connect_timeout,
            "connect",
            peripheral.connect(),
        )
        .await?;

        let data = self.exchange(&peripheral, device_type).await;

        if let Err(e) = bounded(
            self.config.connect_timeout,
            "disconnect",
            peripheral.disconnect(),
        )
        .await
        {
            warn!("Failed to disconnect from {}: {}", address, e);
        }

        let data = data?;
        debug!("Received {} byte response", data.len());
        Ok(DualReading::from_bytes(device_type, &data)?)
    }
}

/// Await a btleplug operation, failing with [`Error::Timeout`] after `duration`.
async fn bounded<T, F>(duration: Duration, operation: &str, fut: F) -> Result<T>
where
    F: Future<Output = std::result::Result<T, btleplug::Error>>,
{
    timeout(duration, fut)
        .await
        .map_err(|_| Error::timeout(operation, duration))?
        .map_err(Error::from)
}

fn find_characteristic(peripheral: &Peripheral, uuid: Uuid) -> Result<Characteristic> {
    peripheral
        .characteristics()
        .into_iter()
        .find(|c| c.uuid == uuid)
        .ok_or_else(|| Error::characteristic_not_found(uuid))
}

/// Peripheral IDs print as `PeripheralId(<id>)`; keep only `<id>`.
fn format_peripheral_id(id: &PeripheralId) -> String {
    format!("{:?}", id)
        .trim_start_matches("PeripheralId(")
        .trim_end_matches(')')
        .to_string()
}
