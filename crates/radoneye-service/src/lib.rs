//! Background poller and Prometheus endpoint for RadonEye RD200 detectors.
//!
//! This crate provides a service that:
//! - Polls the configured detectors over Bluetooth, a few attempts per round
//! - Keeps the last ten readings per detector in memory
//! - Serves the current value of every detector at `GET /metrics`
//! - Mirrors each scrape to a plain-text file for inspection
//!
//! # Endpoints
//!
//! - `GET /metrics` - `radon_api{device="<name>"} <value> <timestamp_ms>` per detector
//! - `GET /api/health` - Service health check
//! - `GET /api/devices` - Registered detectors with current/previous/average values
//! - `GET /api/devices/{id}` - One detector by address or name
//! - `GET /api/status` - Collector state and per-detector statistics
//!
//! # Configuration
//!
//! The service reads configuration from `~/.config/radoneye/server.toml`:
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0:5000"
//!
//! [polling]
//! unit = "pci"
//!
//! [[devices]]
//! address = "C4:7C:8D:6A:3F:01"
//! name = "Bedroom"
//! device_type = 1
//! ```

pub mod api;
pub mod collector;
pub mod config;
pub mod dump;
pub mod snapshot;
pub mod state;

pub use collector::Collector;
pub use config::{
    BleSettings, Config, ConfigError, DeviceConfig, DumpConfig, PollingConfig, ServerConfig,
    ValidationError,
};
pub use dump::{FileSink, NullSink, SnapshotSink};
pub use snapshot::{Snapshot, SnapshotEntry};
pub use state::{AppState, CollectorState};
