//! Hardware integration tests for radoneye-core
//!
//! These tests require an RD200 in range and should be run with:
//! ```text
//! cargo test --package radoneye-core --test hardware_tests -- --ignored --nocapture
//! ```
//!
//! Configure the device via environment variables:
//! - `RADONEYE_DEVICE`: device address (MAC, or peripheral UUID on macOS)
//! - `RADONEYE_DEVICE_TYPE`: protocol selector, `0` or `1` (default `1`)

use std::env;
use std::sync::Arc;
use std::time::Duration;

use radoneye_core::{
    BleConfig, BleLink, DeviceLink, DeviceRegistration, DeviceType, PollConfig, PollScheduler,
    Registry, WindowStore, validate,
};
use tokio::time::timeout;

/// Upper bound for one complete read session.
const BLE_TIMEOUT: Duration = Duration::from_secs(60);

fn get_device() -> Option<(String, DeviceType)> {
    let address = env::var("RADONEYE_DEVICE").ok().filter(|s| !s.is_empty())?;
    let device_type = env::var("RADONEYE_DEVICE_TYPE")
        .ok()
        .and_then(|s| s.parse::<u8>().ok())
        .and_then(|n| DeviceType::try_from(n).ok())
        .unwrap_or_default();
    Some((address, device_type))
}

#[tokio::test]
#[ignore = "requires BLE hardware"]
async fn test_single_read() {
    let Some((address, device_type)) = get_device() else {
        println!("RADONEYE_DEVICE not set, skipping");
        return;
    };

    let link = BleLink::new(BleConfig::default())
        .await
        .expect("no Bluetooth adapter");

    match timeout(BLE_TIMEOUT, link.read(&address, device_type)).await {
        Ok(Ok(reading)) => {
            println!(
                "{}: {} Bq/m³, {} pCi/L",
                address, reading.becquerel, reading.picocurie
            );
            assert!(validate(reading).is_ok());
        }
        Ok(Err(e)) => panic!("Read from {} failed: {}", address, e),
        Err(_) => panic!("Read timed out after {:?}", BLE_TIMEOUT),
    }
}

#[tokio::test]
#[ignore = "requires BLE hardware"]
async fn test_scheduler_round() {
    let Some((address, device_type)) = get_device() else {
        println!("RADONEYE_DEVICE not set, skipping");
        return;
    };

    let registry = Arc::new(
        Registry::new(vec![DeviceRegistration::new(
            address.clone(),
            "Hardware",
            device_type,
        )])
        .unwrap(),
    );
    let windows = Arc::new(WindowStore::new(&registry));
    let link = BleLink::new(BleConfig::default())
        .await
        .expect("no Bluetooth adapter");
    let scheduler = PollScheduler::new(registry, Arc::clone(&windows), link, PollConfig::default());

    let summary = timeout(BLE_TIMEOUT * 3, scheduler.run_round(0))
        .await
        .expect("round timed out");

    println!("Round summary: {:?}", summary);
    if summary.recorded == 1 {
        println!("Current: {} pCi/L", windows.current(&address).unwrap());
    }
}
