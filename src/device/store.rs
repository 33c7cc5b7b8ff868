use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::{debug, info, warn};

use super::error::{ConfigurationError, UnknownDeviceError};
use super::model::Device;
use super::schema::parse_device;
use crate::mqtt::topics::is_addressable;

/// Read-only source of configured devices
pub trait DeviceStore: Send + Sync {
    /// All configured devices, ordered by name.
    fn list(&self) -> Vec<&Device>;

    fn lookup(&self, device_name: &str) -> Result<&Device, UnknownDeviceError>;
}

/// Device catalog parsed from a JSON object of `name -> properties`.
///
/// The whole catalog is validated when it is built; a single misconfigured
/// entry rejects the catalog.
#[derive(Debug, Clone, Default)]
pub struct DeviceCatalog {
    devices: BTreeMap<String, Device>,
}

impl DeviceCatalog {
    pub fn from_value(catalog: &Value) -> Result<Self, ConfigurationError> {
        let entries = catalog.as_object().ok_or(ConfigurationError::NotAnObject)?;

        let mut devices = BTreeMap::new();
        for (device_name, props) in entries {
            let device = parse_device(device_name, props)?;
            debug!(
                device = %device_name,
                variant = device.variant_tag(),
                "Parsed device configuration"
            );
            devices.insert(device_name.clone(), device);
        }

        info!("Loaded {} devices", devices.len());
        let catalog = Self { devices };
        let unaddressable = catalog.unaddressable();
        if !unaddressable.is_empty() {
            warn!(
                "Devices {:?} can not be controlled over MQTT, names must only contain letters, digits and '_'",
                unaddressable
            );
        }
        Ok(catalog)
    }

    /// Names whose MQTT topics can not be mapped back to the device
    pub fn unaddressable(&self) -> Vec<&str> {
        self.devices
            .keys()
            .map(String::as_str)
            .filter(|name| !is_addressable(name))
            .collect()
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigurationError> {
        let catalog: Value = serde_json::from_str(json)?;
        Self::from_value(&catalog)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        info!("Loading device catalog from {}", path.display());
        let raw = fs::read_to_string(path).map_err(|source| ConfigurationError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

impl DeviceStore for DeviceCatalog {
    fn list(&self) -> Vec<&Device> {
        self.devices.values().collect()
    }

    fn lookup(&self, device_name: &str) -> Result<&Device, UnknownDeviceError> {
        self.devices
            .get(device_name)
            .ok_or_else(|| UnknownDeviceError(device_name.to_string()))
    }
}
