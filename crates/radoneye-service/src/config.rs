//! Service configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use radoneye_core::{BleConfig, DeviceRegistration, PollConfig};
use radoneye_types::{DeviceType, Unit};

/// Service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Polling cadence and unit.
    pub polling: PollingConfig,
    /// Plain-text snapshot mirror.
    pub dump: DumpConfig,
    /// Bluetooth timeouts.
    pub ble: BleSettings,
    /// Devices to monitor, in polling order.
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Validate the configuration and return every problem found.
    ///
    /// # Example
    ///
    /// ```
    /// use radoneye_service::Config;
    ///
    /// let config = Config::default();
    /// config.validate().expect("Default config should be valid");
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        errors.extend(self.server.validate());
        errors.extend(self.polling.validate());
        errors.extend(self.dump.validate());
        errors.extend(self.ble.validate());

        let mut seen_addresses = std::collections::HashSet::new();
        let mut seen_names = std::collections::HashSet::new();
        for (i, device) in self.devices.iter().enumerate() {
            let prefix = format!("devices[{}]", i);
            errors.extend(device.validate(&prefix));

            if !seen_addresses.insert(device.address.to_lowercase()) {
                errors.push(ValidationError {
                    field: format!("{}.address", prefix),
                    message: format!("duplicate device address '{}'", device.address),
                });
            }
            if !seen_names.insert(device.name.as_str()) {
                errors.push(ValidationError {
                    field: format!("{}.name", prefix),
                    message: format!("duplicate device name '{}'", device.name),
                });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Device registrations in configuration order.
    pub fn registrations(&self) -> Result<Vec<DeviceRegistration>, ConfigError> {
        self.devices
            .iter()
            .enumerate()
            .map(|(i, device)| {
                device.registration().ok_or_else(|| {
                    ConfigError::Validation(vec![ValidationError {
                        field: format!("devices[{}].device_type", i),
                        message: format!("unknown device type {}", device.device_type),
                    }])
                })
            })
            .collect()
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:5000").
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:5000".to_string(),
        }
    }
}

impl ServerConfig {
    /// Validate server configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.bind.is_empty() {
            errors.push(ValidationError {
                field: "server.bind".to_string(),
                message: "bind address cannot be empty".to_string(),
            });
            return errors;
        }

        match self.bind.rsplit_once(':') {
            None => errors.push(ValidationError {
                field: "server.bind".to_string(),
                message: format!(
                    "invalid bind address '{}': expected format 'host:port'",
                    self.bind
                ),
            }),
            Some((_, port)) => match port.parse::<u16>() {
                Ok(0) => errors.push(ValidationError {
                    field: "server.bind".to_string(),
                    message: "port cannot be 0".to_string(),
                }),
                Err(_) => errors.push(ValidationError {
                    field: "server.bind".to_string(),
                    message: format!("invalid port '{}': must be a number 1-65535", port),
                }),
                Ok(_) => {}
            },
        }

        errors
    }
}

/// Polling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Unit recorded and exported.
    pub unit: Unit,
    /// Read attempts per device per round.
    pub attempts: u32,
    /// Rounds per cycle.
    pub rounds_per_cycle: u32,
    /// Pause after every round, in seconds.
    pub round_interval_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        let poll = PollConfig::default();
        Self {
            unit: poll.unit,
            attempts: poll.attempts,
            rounds_per_cycle: poll.rounds_per_cycle,
            round_interval_secs: poll.round_interval.as_secs(),
        }
    }
}

impl PollingConfig {
    /// Validate polling configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.attempts == 0 {
            errors.push(ValidationError {
                field: "polling.attempts".to_string(),
                message: "at least one attempt is required".to_string(),
            });
        }
        if self.rounds_per_cycle == 0 {
            errors.push(ValidationError {
                field: "polling.rounds_per_cycle".to_string(),
                message: "at least one round per cycle is required".to_string(),
            });
        }
        if self.round_interval_secs == 0 {
            errors.push(ValidationError {
                field: "polling.round_interval_secs".to_string(),
                message: "round interval must be at least 1 second".to_string(),
            });
        }

        errors
    }

    /// Scheduler settings for these values.
    pub fn to_poll_config(&self) -> PollConfig {
        PollConfig::default()
            .unit(self.unit)
            .attempts(self.attempts)
            .rounds_per_cycle(self.rounds_per_cycle)
            .round_interval(Duration::from_secs(self.round_interval_secs))
    }
}

/// Snapshot mirror file configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DumpConfig {
    /// Write the mirror file on every scrape.
    pub enabled: bool,
    /// Mirror file path, relative to the working directory unless absolute.
    pub path: PathBuf,
}

impl Default for DumpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from("radon.txt"),
        }
    }
}

impl DumpConfig {
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.enabled && self.path.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "dump.path".to_string(),
                message: "dump path cannot be empty while the dump is enabled".to_string(),
            });
        }

        errors
    }
}

/// Bluetooth timeouts, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BleSettings {
    pub scan_secs: u64,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
}

impl Default for BleSettings {
    fn default() -> Self {
        let ble = BleConfig::default();
        Self {
            scan_secs: ble.scan_duration.as_secs(),
            connect_timeout_secs: ble.connect_timeout.as_secs(),
            read_timeout_secs: ble.read_timeout.as_secs(),
        }
    }
}

impl BleSettings {
    pub fn validate(&self) -> Vec<ValidationError> {
        [
            ("ble.scan_secs", self.scan_secs),
            ("ble.connect_timeout_secs", self.connect_timeout_secs),
            ("ble.read_timeout_secs", self.read_timeout_secs),
        ]
        .into_iter()
        .filter(|(_, secs)| *secs == 0)
        .map(|(field, _)| ValidationError {
            field: field.to_string(),
            message: "timeout must be at least 1 second".to_string(),
        })
        .collect()
    }

    pub fn to_ble_config(&self) -> BleConfig {
        BleConfig::default()
            .scan_duration(Duration::from_secs(self.scan_secs))
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .read_timeout(Duration::from_secs(self.read_timeout_secs))
    }
}

/// Configuration for a device to monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Bluetooth address (peripheral UUID on macOS).
    pub address: String,
    /// Display name used as the metric label.
    pub name: String,
    /// Protocol selector: 0 for the original RD200, 1 for newer units.
    #[serde(default = "default_device_type")]
    pub device_type: u8,
}

fn default_device_type() -> u8 {
    DeviceType::default().into()
}

impl DeviceConfig {
    pub fn new(address: impl Into<String>, name: impl Into<String>, device_type: u8) -> Self {
        Self {
            address: address.into(),
            name: name.into(),
            device_type,
        }
    }

    /// Validate device configuration.
    pub fn validate(&self, prefix: &str) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.address.trim().is_empty() {
            errors.push(ValidationError {
                field: format!("{}.address", prefix),
                message: "device address cannot be empty".to_string(),
            });
        }
        if self.name.trim().is_empty() {
            errors.push(ValidationError {
                field: format!("{}.name", prefix),
                message: "device name cannot be empty".to_string(),
            });
        }
        if DeviceType::try_from(self.device_type).is_err() {
            errors.push(ValidationError {
                field: format!("{}.device_type", prefix),
                message: format!(
                    "unknown device type {} (expected 0 or 1)",
                    self.device_type
                ),
            });
        }

        errors
    }

    fn registration(&self) -> Option<DeviceRegistration> {
        let device_type = DeviceType::try_from(self.device_type).ok()?;
        Some(DeviceRegistration::new(
            self.address.clone(),
            self.name.clone(),
            device_type,
        ))
    }
}

/// Parse a `MAC:Name` command line entry.
///
/// An entry starting with a six-octet MAC splits right after it, so the name
/// may contain colons. Any other address (a platform UUID, say) splits at the
/// last `:`. Returns `None` when either side is empty or there is no `:`.
///
/// ```
/// use radoneye_service::config::parse_sensor_arg;
///
/// assert_eq!(
///     parse_sensor_arg("AA:BB:CC:DD:EE:FF:Bedroom"),
///     Some(("AA:BB:CC:DD:EE:FF".to_string(), "Bedroom".to_string()))
/// );
/// assert_eq!(
///     parse_sensor_arg("AA:BB:CC:DD:EE:FF:Floor:1"),
///     Some(("AA:BB:CC:DD:EE:FF".to_string(), "Floor:1".to_string()))
/// );
/// assert_eq!(parse_sensor_arg("Bedroom"), None);
/// ```
pub fn parse_sensor_arg(arg: &str) -> Option<(String, String)> {
    let arg = arg.trim();
    let (address, name) = match split_after_mac(arg) {
        Some(parts) => parts,
        None => arg.rsplit_once(':')?,
    };
    let (address, name) = (address.trim(), name.trim());
    if address.is_empty() || name.is_empty() {
        return None;
    }
    Some((address.to_string(), name.to_string()))
}

/// Split `XX:XX:XX:XX:XX:XX:rest` after the MAC address.
fn split_after_mac(arg: &str) -> Option<(&str, &str)> {
    const MAC_LEN: usize = 17;

    let mac = arg.get(..MAC_LEN)?;
    let rest = arg.get(MAC_LEN..)?.strip_prefix(':')?;
    let is_mac = mac.split(':').count() == 6
        && mac
            .split(':')
            .all(|octet| octet.len() == 2 && octet.bytes().all(|b| b.is_ascii_hexdigit()));
    is_mac.then_some((mac, rest))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

/// A single validation error with context.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The field path (e.g., `server.bind` or `devices[0].address`).
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("radoneye")
        .join("server.toml")
}
