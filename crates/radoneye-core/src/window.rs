//! Bounded per-device reading history.
//!
//! # Concurrency
//!
//! Each device's [`ReadingWindow`] lives behind its own `std::sync::RwLock`.
//! The scheduler holds the write lock for exactly one `VecDeque` push (plus
//! an eviction when full); readers take the read lock. Critical sections
//! never span an `.await`, so a blocking lock is appropriate here and a
//! reader always sees either the state before an append or the state after
//! it. There is no lock across devices.

use std::collections::{HashMap, VecDeque};
use std::sync::{PoisonError, RwLock};

use serde::Serialize;

use radoneye_types::round2;

use crate::error::{Error, Result};
use crate::registry::Registry;

/// Maximum number of readings kept per device.
pub const WINDOW_CAPACITY: usize = 10;

/// FIFO of the most recent readings for one device, oldest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadingWindow {
    readings: VecDeque<f64>,
}

impl ReadingWindow {
    pub fn new() -> Self {
        Self {
            readings: VecDeque::with_capacity(WINDOW_CAPACITY),
        }
    }

    /// Append a reading, evicting the oldest one when already full.
    pub fn push(&mut self, value: f64) {
        if self.readings.len() >= WINDOW_CAPACITY {
            self.readings.pop_front();
        }
        self.readings.push_back(value);
    }

    /// Most recent reading, or 0 when empty.
    pub fn current(&self) -> f64 {
        self.readings.back().copied().unwrap_or(0.0)
    }

    /// Second most recent reading, or 0 with fewer than two readings.
    pub fn previous(&self) -> f64 {
        self.readings
            .len()
            .checked_sub(2)
            .and_then(|i| self.readings.get(i))
            .copied()
            .unwrap_or(0.0)
    }

    /// Mean of the window rounded to two decimals, or 0 when empty.
    pub fn average(&self) -> f64 {
        if self.readings.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.readings.iter().sum();
        round2(sum / self.readings.len() as f64)
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Readings oldest first.
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.readings.iter().copied()
    }

    fn summary(&self) -> WindowSummary {
        WindowSummary {
            current: self.current(),
            previous: self.previous(),
            average: self.average(),
            samples: self.len(),
        }
    }
}

/// Derived values of one window, read under a single lock acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindowSummary {
    pub current: f64,
    pub previous: f64,
    pub average: f64,
    pub samples: usize,
}

/// One [`ReadingWindow`] per registered device.
#[derive(Debug)]
pub struct WindowStore {
    windows: HashMap<String, RwLock<ReadingWindow>>,
}

impl WindowStore {
    /// Create an empty window for every registered device.
    pub fn new(registry: &Registry) -> Self {
        let windows = registry
            .iter()
            .map(|d| (key(&d.address), RwLock::new(ReadingWindow::new())))
            .collect();
        Self { windows }
    }

    fn window(&self, address: &str) -> Result<&RwLock<ReadingWindow>> {
        self.windows
            .get(&key(address))
            .ok_or_else(|| Error::UnknownDevice(address.to_string()))
    }

    fn read<T>(&self, address: &str, f: impl FnOnce(&ReadingWindow) -> T) -> Result<T> {
        let window = self.window(address)?;
        let guard = window.read().unwrap_or_else(PoisonError::into_inner);
        Ok(f(&guard))
    }

    /// Record a reading for `address`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownDevice`] if the address is not registered.
    pub fn append(&self, address: &str, value: f64) -> Result<()> {
        let window = self.window(address)?;
        window
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(value);
        Ok(())
    }

    pub fn current(&self, address: &str) -> Result<f64> {
        self.read(address, ReadingWindow::current)
    }

    pub fn previous(&self, address: &str) -> Result<f64> {
        self.read(address, ReadingWindow::previous)
    }

    pub fn average(&self, address: &str) -> Result<f64> {
        self.read(address, ReadingWindow::average)
    }

    pub fn len(&self, address: &str) -> Result<usize> {
        self.read(address, ReadingWindow::len)
    }

    pub fn summary(&self, address: &str) -> Result<WindowSummary> {
        self.read(address, ReadingWindow::summary)
    }

    /// Copy of the window contents, oldest first.
    pub fn values(&self, address: &str) -> Result<Vec<f64>> {
        self.read(address, |w| w.values().collect())
    }
}

fn key(address: &str) -> String {
    address.to_lowercase()
}
