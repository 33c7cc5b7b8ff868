//! Device variants
//!
//! Every socket is addressed either by a pair of raw codes or by a
//! system/unit code pair. The set of variants is closed; new hardware
//! addressing schemes need a new variant here and a schema in
//! [`super::schema`].

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::mqtt::message::on_off;

/// Number of transmissions per logical on/off command unless configured otherwise
pub const DEFAULT_RESEND: u32 = 3;

/// Socket controlled by two raw numeric codes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeDevice {
    pub device_name: String,
    pub code_on: u64,
    pub code_off: u64,
    pub resend: u32,
}

impl CodeDevice {
    pub fn new(device_name: impl Into<String>, code_on: u64, code_off: u64) -> Self {
        Self {
            device_name: device_name.into(),
            code_on,
            code_off,
            resend: DEFAULT_RESEND,
        }
    }

    pub fn with_resend(mut self, resend: u32) -> Self {
        self.resend = resend;
        self
    }
}

/// Socket addressed by a system code (dip switches) and a unit code
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SystemDevice {
    pub device_name: String,
    pub system_code: String,
    pub device_code: u32,
    pub resend: u32,
}

impl SystemDevice {
    pub fn new(
        device_name: impl Into<String>,
        system_code: impl Into<String>,
        device_code: u32,
    ) -> Self {
        Self {
            device_name: device_name.into(),
            system_code: system_code.into(),
            device_code,
            resend: DEFAULT_RESEND,
        }
    }

    pub fn with_resend(mut self, resend: u32) -> Self {
        self.resend = resend;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Device {
    Code(CodeDevice),
    System(SystemDevice),
}

impl Device {
    pub fn device_name(&self) -> &str {
        match self {
            Device::Code(device) => &device.device_name,
            Device::System(device) => &device.device_name,
        }
    }

    /// Name of the variant as exposed to API consumers
    pub fn variant_tag(&self) -> &'static str {
        match self {
            Device::Code(_) => "CodeDevice",
            Device::System(_) => "SystemDevice",
        }
    }

    pub fn resend(&self) -> u32 {
        match self {
            Device::Code(device) => device.resend,
            Device::System(device) => device.resend,
        }
    }

    /// All addressing properties of the device except its name.
    pub fn configuration(&self) -> Map<String, Value> {
        let value = match self {
            Device::Code(device) => serde_json::to_value(device),
            Device::System(device) => serde_json::to_value(device),
        };

        match value {
            Ok(Value::Object(mut map)) => {
                map.remove("device_name");
                map
            }
            // Plain structs of strings and integers always serialize to an object
            _ => Map::new(),
        }
    }
}

impl From<CodeDevice> for Device {
    fn from(device: CodeDevice) -> Self {
        Device::Code(device)
    }
}

impl From<SystemDevice> for Device {
    fn from(device: SystemDevice) -> Self {
        Device::System(device)
    }
}

/// A device paired with its last known state.
///
/// Built fresh by the registry on every read and never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatefulDevice {
    pub device: Device,
    pub state: bool,
}

impl StatefulDevice {
    pub fn new(device: Device, state: bool) -> Self {
        Self { device, state }
    }

    pub fn device_name(&self) -> &str {
        self.device.device_name()
    }
}

impl Serialize for StatefulDevice {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut out = serializer.serialize_struct("StatefulDevice", 4)?;
        out.serialize_field("device_name", self.device.device_name())?;
        out.serialize_field("type", self.device.variant_tag())?;
        out.serialize_field("configuration", &self.device.configuration())?;
        out.serialize_field("state", on_off(self.state))?;
        out.end()
    }
}
