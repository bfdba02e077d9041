//! Registered devices.
//!
//! The registry is built once at startup from configuration and never
//! changes afterwards. The scheduler and the HTTP layer share it through an
//! `Arc<Registry>`.

use std::collections::HashSet;

use serde::Serialize;
use thiserror::Error;

use radoneye_types::DeviceType;

/// A device the service monitors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceRegistration {
    /// Link-layer address (MAC on Linux/Windows, peripheral UUID on macOS).
    pub address: String,
    /// Operator-assigned display name, unique per registry.
    pub name: String,
    /// Decode protocol for this device.
    pub device_type: DeviceType,
}

impl DeviceRegistration {
    /// Create a new registration.
    pub fn new(
        address: impl Into<String>,
        name: impl Into<String>,
        device_type: DeviceType,
    ) -> Self {
        Self {
            address: address.into(),
            name: name.into(),
            device_type,
        }
    }
}

/// Problems found while building a [`Registry`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("device address cannot be empty")]
    EmptyAddress,
    #[error("display name for '{0}' cannot be empty")]
    EmptyName(String),
    #[error("duplicate device address '{0}'")]
    DuplicateAddress(String),
    #[error("duplicate display name '{0}'")]
    DuplicateName(String),
}

/// Ordered, immutable set of registered devices.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    devices: Vec<DeviceRegistration>,
}

impl Registry {
    /// Build a registry, preserving registration order.
    ///
    /// Addresses are compared case-insensitively.
    pub fn new(devices: Vec<DeviceRegistration>) -> Result<Self, RegistryError> {
        let mut addresses = HashSet::new();
        let mut names = HashSet::new();

        for device in &devices {
            if device.address.is_empty() {
                return Err(RegistryError::EmptyAddress);
            }
            if device.name.is_empty() {
                return Err(RegistryError::EmptyName(device.address.clone()));
            }
            if !addresses.insert(device.address.to_lowercase()) {
                return Err(RegistryError::DuplicateAddress(device.address.clone()));
            }
            if !names.insert(device.name.as_str()) {
                return Err(RegistryError::DuplicateName(device.name.clone()));
            }
        }

        Ok(Self { devices })
    }

    /// Look up a device by address.
    pub fn get(&self, address: &str) -> Option<&DeviceRegistration> {
        self.devices
            .iter()
            .find(|d| d.address.eq_ignore_ascii_case(address))
    }

    /// Iterate in registration order.
    pub fn iter(&self) -> std::slice::Iter<'_, DeviceRegistration> {
        self.devices.iter()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

impl<'a> IntoIterator for &'a Registry {
    type Item = &'a DeviceRegistration;
    type IntoIter = std::slice::Iter<'a, DeviceRegistration>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reg(address: &str, name: &str) -> DeviceRegistration {
        DeviceRegistration::new(address, name, DeviceType::Rd200V2)
    }

    #[test]
    fn test_preserves_order() {
        let registry = Registry::new(vec![
            reg("CC:CC:CC:CC:CC:CC", "Cellar"),
            reg("AA:AA:AA:AA:AA:AA", "Attic"),
        ])
        .unwrap();

        let names: Vec<_> = registry.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["Cellar", "Attic"]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = Registry::new(vec![reg("aa:bb:cc:dd:ee:ff", "Bedroom")]).unwrap();
        assert_eq!(registry.get("AA:BB:CC:DD:EE:FF").unwrap().name, "Bedroom");
        assert!(registry.get("11:22:33:44:55:66").is_none());
    }

    #[test]
    fn test_rejects_duplicate_address() {
        let err = Registry::new(vec![
            reg("AA:BB:CC:DD:EE:FF", "Bedroom"),
            reg("aa:bb:cc:dd:ee:ff", "Kitchen"),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateAddress("aa:bb:cc:dd:ee:ff".to_string())
        );
    }

    #[test]
    fn test_rejects_duplicate_name() {
        let err = Registry::new(vec![
            reg("AA:BB:CC:DD:EE:01", "Bedroom"),
            reg("AA:BB:CC:DD:EE:02", "Bedroom"),
        ])
        .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateName("Bedroom".to_string()));
    }

    #[test]
    fn test_rejects_empty_fields() {
        assert_eq!(
            Registry::new(vec![reg("", "Bedroom")]).unwrap_err(),
            RegistryError::EmptyAddress
        );
        assert!(matches!(
            Registry::new(vec![reg("AA:BB", "")]).unwrap_err(),
            RegistryError::EmptyName(_)
        ));
    }

    #[test]
    fn test_empty_registry() {
        let registry = Registry::default();
        assert!(registry.is_empty());
        assert!(registry.iter().next().is_none());
    }
}
