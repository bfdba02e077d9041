//! Mock device link for testing.
//!
//! [`MockLink`] implements [`DeviceLink`] without touching Bluetooth. Each
//! address has a queue of scripted outcomes that are consumed one per call;
//! once a queue is empty the link falls back to a default outcome.
//!
//! # Features
//!
//! - **Failure injection**: queue failures ahead of a reading
//! - **Latency simulation**: delay every read to mimic a slow handshake
//! - **Call accounting**: count reads per address to assert retry budgets

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use radoneye_types::{DeviceType, DualReading};

use crate::error::{Error, Result};
use crate::link::DeviceLink;

#[derive(Debug, Clone)]
enum Scripted {
    Reading(DualReading),
    Failure(String),
}

/// A scripted [`DeviceLink`].
///
/// # Example
///
/// ```
/// use radoneye_core::{DeviceLink, MockLink};
/// use radoneye_types::{DeviceType, DualReading};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let link = MockLink::new();
/// link.fail_times("AA:BB", 2);
/// link.push_reading("AA:BB", DualReading::from_becquerel(40.0));
///
/// assert!(link.read("AA:BB", DeviceType::Rd200V2).await.is_err());
/// assert!(link.read("AA:BB", DeviceType::Rd200V2).await.is_err());
/// assert!(link.read("AA:BB", DeviceType::Rd200V2).await.is_ok());
/// assert_eq!(link.calls("AA:BB"), 3);
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MockLink {
    scripts: Mutex<HashMap<String, VecDeque<Scripted>>>,
    calls: Mutex<HashMap<String, u32>>,
    default: Mutex<Option<DualReading>>,
    total_calls: AtomicU32,
    /// Simulated read latency in milliseconds (0 = no delay).
    latency_ms: AtomicU64,
}

impl MockLink {
    /// Create a link that fails every unscripted read.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a link that answers every unscripted read with `reading`.
    pub fn with_default(reading: DualReading) -> Self {
        let link = Self::new();
        link.set_default(Some(reading));
        link
    }

    /// Set (or clear) the outcome used once an address's script is exhausted.
    pub fn set_default(&self, reading: Option<DualReading>) {
        *self.default.lock().unwrap_or_else(PoisonError::into_inner) = reading;
    }

    /// Queue a successful read for `address`.
    pub fn push_reading(&self, address: &str, reading: DualReading) {
        self.push(address, Scripted::Reading(reading));
    }

    /// Queue a failed read for `address`.
    pub fn push_failure(&self, address: &str, message: impl Into<String>) {
        self.push(address, Scripted::Failure(message.into()));
    }

    /// Queue `count` failed reads for `address`.
    pub fn fail_times(&self, address: &str, count: u32) {
        for i in 0..count {
            self.push_failure(address, format!("Mock failure {}", i + 1));
        }
    }

    /// Delay every read by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::Relaxed);
    }

    /// Number of reads issued for `address`.
    pub fn calls(&self, address: &str) -> u32 {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&address.to_lowercase())
            .copied()
            .unwrap_or(0)
    }

    /// Number of reads issued for all addresses.
    pub fn total_calls(&self) -> u32 {
        self.total_calls.load(Ordering::Relaxed)
    }

    fn push(&self, address: &str, outcome: Scripted) {
        self.scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(address.to_lowercase())
            .or_default()
            .push_back(outcome);
    }

    fn next_outcome(&self, address: &str) -> Option<Scripted> {
        let key = address.to_lowercase();
        *self
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key.clone())
            .or_default() += 1;
        self.total_calls.fetch_add(1, Ordering::Relaxed);

        let scripted = self
            .scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(&key)
            .and_then(VecDeque::pop_front);

        scripted.or_else(|| {
            self.default
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .map(Scripted::Reading)
        })
    }
}

#[async_trait]
impl DeviceLink for MockLink {
    async fn read(&self, address: &str, _device_type: DeviceType) -> Result<DualReading> {
        let latency = self.latency_ms.load(Ordering::Relaxed);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        match self.next_outcome(address) {
            Some(Scripted::Reading(reading)) => Ok(reading),
            Some(Scripted::Failure(message)) => Err(Error::Mock(message)),
            None => Err(Error::DeviceNotFound(address.to_string())),
        }
    }
}
