//! Variant schemas for device configuration
//!
//! Configuration arrives as a loosely typed property bag per device. Each
//! variant declares which keys it requires, which it accepts optionally and
//! how the values are coerced. [`parse_device`] tries the schemas in the
//! order of [`VARIANTS`] and the first one accepting the properties wins:
//!
//! 1. `CodeDevice`   - `code_on`, `code_off`, optional `resend`
//! 2. `SystemDevice` - `system_code`, `device_code`, optional `resend`
//!
//! A schema rejects unknown keys, so a bag mixing fields of both variants
//! matches neither and fails at load time.

use serde_json::{Map, Value};
use thiserror::Error;

use super::error::ConfigurationError;
use super::model::{CodeDevice, Device, SystemDevice, DEFAULT_RESEND};

type Props = Map<String, Value>;

/// Why a single variant schema rejected a property bag
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("missing required property '{0}'")]
    Missing(&'static str),

    #[error("unexpected property '{0}'")]
    Unexpected(String),

    #[error("property '{field}' {reason}")]
    Invalid { field: &'static str, reason: String },
}

pub struct VariantSchema {
    pub tag: &'static str,
    pub required: &'static [&'static str],
    pub optional: &'static [&'static str],
    build: fn(&str, &Props) -> Result<Device, SchemaError>,
}

impl VariantSchema {
    /// Checks the key set and builds the device with coerced values.
    pub fn accept(&self, device_name: &str, props: &Props) -> Result<Device, SchemaError> {
        let known = |key: &str| self.required.contains(&key) || self.optional.contains(&key);
        if let Some(unknown) = props.keys().find(|key| !known(key.as_str())) {
            return Err(SchemaError::Unexpected(unknown.clone()));
        }
        if let Some(missing) = self.required.iter().find(|key| !props.contains_key(**key)) {
            return Err(SchemaError::Missing(*missing));
        }
        (self.build)(device_name, props)
    }
}

/// Known variants in trial order
pub const VARIANTS: &[VariantSchema] = &[
    VariantSchema {
        tag: "CodeDevice",
        required: &["code_on", "code_off"],
        optional: &["resend"],
        build: build_code_device,
    },
    VariantSchema {
        tag: "SystemDevice",
        required: &["system_code", "device_code"],
        optional: &["resend"],
        build: build_system_device,
    },
];

/// Resolves one catalog entry into a typed device.
pub fn parse_device(device_name: &str, props: &Value) -> Result<Device, ConfigurationError> {
    if device_name.is_empty() {
        return Err(ConfigurationError::EmptyName);
    }

    let Some(props) = props.as_object() else {
        return Err(ConfigurationError::Misconfigured {
            device: device_name.to_string(),
            reasons: "properties must be an object".to_string(),
        });
    };

    let mut reasons = Vec::with_capacity(VARIANTS.len());
    for schema in VARIANTS {
        match schema.accept(device_name, props) {
            Ok(device) => return Ok(device),
            Err(e) => reasons.push(format!("{}: {}", schema.tag, e)),
        }
    }

    Err(ConfigurationError::Misconfigured {
        device: device_name.to_string(),
        reasons: reasons.join("; "),
    })
}

fn build_code_device(device_name: &str, props: &Props) -> Result<Device, SchemaError> {
    Ok(Device::Code(CodeDevice {
        device_name: device_name.to_string(),
        code_on: integer(props, "code_on")?,
        code_off: integer(props, "code_off")?,
        resend: resend(props)?,
    }))
}

fn build_system_device(device_name: &str, props: &Props) -> Result<Device, SchemaError> {
    let device_code = integer(props, "device_code")?;
    Ok(Device::System(SystemDevice {
        device_name: device_name.to_string(),
        system_code: text(props, "system_code")?,
        device_code: u32::try_from(device_code).map_err(|_| SchemaError::Invalid {
            field: "device_code",
            reason: format!("is out of range: {}", device_code),
        })?,
        resend: resend(props)?,
    }))
}

fn resend(props: &Props) -> Result<u32, SchemaError> {
    if !props.contains_key("resend") {
        return Ok(DEFAULT_RESEND);
    }
    let value = integer(props, "resend")?;
    match u32::try_from(value) {
        Ok(resend) if resend > 0 => Ok(resend),
        _ => Err(SchemaError::Invalid {
            field: "resend",
            reason: format!("must be a positive integer, got {}", value),
        }),
    }
}

/// Non-negative integer, either a JSON number or a decimal string
fn integer(props: &Props, field: &'static str) -> Result<u64, SchemaError> {
    let invalid = |reason: String| SchemaError::Invalid { field, reason };

    match props.get(field) {
        Some(Value::Number(number)) => number
            .as_u64()
            .ok_or_else(|| invalid(format!("must be a non-negative integer, got {}", number))),
        Some(Value::String(raw)) => raw
            .trim()
            .parse::<u64>()
            .map_err(|_| invalid(format!("must be a non-negative integer, got '{}'", raw))),
        Some(other) => Err(invalid(format!("must be an integer, got {}", other))),
        None => Err(SchemaError::Missing(field)),
    }
}

fn text(props: &Props, field: &'static str) -> Result<String, SchemaError> {
    match props.get(field) {
        Some(Value::String(raw)) => Ok(raw.clone()),
        Some(Value::Number(number)) => Ok(number.to_string()),
        Some(other) => Err(SchemaError::Invalid {
            field,
            reason: format!("must be a string, got {}", other),
        }),
        None => Err(SchemaError::Missing(field)),
    }
}
