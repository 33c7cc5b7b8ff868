//! Error definitions for the device catalog

use std::path::PathBuf;
use thiserror::Error;

/// Raised while loading the device catalog. Always fatal for startup.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// The catalog root is not a JSON object
    #[error("Device catalog must be a JSON object mapping device names to properties")]
    NotAnObject,

    /// An entry matched none of the known device variants
    #[error("Misconfigured device '{device}': {reasons}")]
    Misconfigured { device: String, reasons: String },

    /// Device names must not be empty
    #[error("Device names must not be empty")]
    EmptyName,

    #[error("Could not read device catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Device catalog is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// The requested device is not part of the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("The requested device '{0}' is unknown")]
pub struct UnknownDeviceError(pub String);

impl UnknownDeviceError {
    pub fn device_name(&self) -> &str {
        &self.0
    }
}
