//! Point-in-time view of every device's current value.
//!
//! A [`Snapshot`] is captured once per scrape. All of its entries share a
//! single millisecond timestamp; each entry reflects the latest committed
//! state of that device's window at capture time. There is no atomicity
//! across devices.

use std::fmt::Write as _;

use time::OffsetDateTime;

use radoneye_core::{Registry, Result, WindowStore};

/// Metric name used for every exported line.
pub const METRIC_NAME: &str = "radon_api";

/// Content type of the text exposition format.
pub const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// One device's exported value.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotEntry {
    pub name: String,
    pub value: f64,
}

/// Current values of all devices with at least one reading.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Milliseconds since the Unix epoch, shared by every entry.
    pub timestamp_ms: i64,
    /// Entries in registration order.
    pub entries: Vec<SnapshotEntry>,
}

impl Snapshot {
    /// Read the current value of every registered device that has data.
    ///
    /// # Errors
    ///
    /// Fails only if `windows` was built from a different registry.
    pub fn capture(registry: &Registry, windows: &WindowStore, timestamp_ms: i64) -> Result<Self> {
        let mut entries = Vec::with_capacity(registry.len());
        for device in registry {
            let summary = windows.summary(&device.address)?;
            if summary.samples > 0 {
                entries.push(SnapshotEntry {
                    name: device.name.clone(),
                    value: summary.current,
                });
            }
        }
        Ok(Self {
            timestamp_ms,
            entries,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Prometheus text exposition, one line per entry.
    pub fn render_prometheus(&self) -> String {
        let mut output = String::with_capacity(self.entries.len() * 64);
        for entry in &self.entries {
            let _ = writeln!(
                output,
                "{}{{device=\"{}\"}} {} {}",
                METRIC_NAME,
                escape_label_value(&entry.name),
                entry.value,
                self.timestamp_ms
            );
        }
        output
    }

    /// Plain `name=value timestamp` lines for the mirror file.
    pub fn render_dump(&self) -> String {
        let mut output = String::with_capacity(self.entries.len() * 32);
        for entry in &self.entries {
            let _ = writeln!(output, "{}={} {}", entry.name, entry.value, self.timestamp_ms);
        }
        output
    }
}

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

/// Escape special characters in Prometheus label values.
fn escape_label_value(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use radoneye_core::DeviceRegistration;
    use radoneye_types::DeviceType;

    const TS: i64 = 1_700_000_000_123;

    fn fixture() -> (Registry, WindowStore) {
        let registry = Registry::new(vec![
            DeviceRegistration::new("AA:00", "Bedroom", DeviceType::Rd200V2),
            DeviceRegistration::new("AA:01", "Cellar", DeviceType::Rd200V2),
            DeviceRegistration::new("AA:02", "Attic", DeviceType::Rd200),
        ])
        .unwrap();
        let windows = WindowStore::new(&registry);
        (registry, windows)
    }

    #[test]
    fn test_single_device_line() {
        let (registry, windows) = fixture();
        windows.append("AA:00", 42.5).unwrap();

        let snapshot = Snapshot::capture(&registry, &windows, TS).unwrap();

        assert_eq!(
            snapshot.render_prometheus(),
            "radon_api{device=\"Bedroom\"} 42.5 1700000000123\n"
        );
    }

    #[test]
    fn test_empty_store_renders_nothing() {
        let (registry, windows) = fixture();
        let snapshot = Snapshot::capture(&registry, &windows, TS).unwrap();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.render_prometheus(), "");
        assert_eq!(snapshot.render_dump(), "");
    }

    #[test]
    fn test_devices_without_readings_are_omitted() {
        let (registry, windows) = fixture();
        windows.append("AA:02", 1.0).unwrap();
        windows.append("AA:00", 3.0).unwrap();
        windows.append("AA:00", 15.0).unwrap();

        let snapshot = Snapshot::capture(&registry, &windows, TS).unwrap();

        assert_eq!(
            snapshot.entries,
            vec![
                SnapshotEntry {
                    name: "Bedroom".to_string(),
                    value: 15.0
                },
                SnapshotEntry {
                    name: "Attic".to_string(),
                    value: 1.0
                },
            ]
        );
        assert_eq!(
            snapshot.render_prometheus(),
            "radon_api{device=\"Bedroom\"} 15 1700000000123\n\
             radon_api{device=\"Attic\"} 1 1700000000123\n"
        );
        assert_eq!(
            snapshot.render_dump(),
            "Bedroom=15 1700000000123\nAttic=1 1700000000123\n"
        );
    }

    #[test]
    fn test_label_escaping() {
        assert_eq!(escape_label_value("plain"), "plain");
        assert_eq!(
            escape_label_value("a \"quoted\" \\ name\n"),
            "a \\\"quoted\\\" \\\\ name\\n"
        );
    }

    #[test]
    fn test_capture_with_foreign_store_fails() {
        let (registry, _) = fixture();
        let other = Registry::new(vec![DeviceRegistration::new(
            "FF:FF",
            "Other",
            DeviceType::Rd200V2,
        )])
        .unwrap();
        let windows = WindowStore::new(&other);
        assert!(Snapshot::capture(&registry, &windows, TS).is_err());
    }

    #[test]
    fn test_now_millis_is_recent() {
        // 2023-11-14 in milliseconds.
        assert!(now_millis() > 1_700_000_000_000);
    }
}
