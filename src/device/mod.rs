//! # Device Module
//!
//! Typed model of the 433MHz power sockets this service controls and the
//! read-only catalog they are loaded into.
//!
//! ```text
//! device/
//! ├── model.rs   - Device variants and the stateful view handed to callers
//! ├── schema.rs  - Ordered variant schemas used to parse loose configuration
//! ├── store.rs   - DeviceStore trait and the JSON backed catalog
//! └── error.rs   - Configuration and lookup errors
//! ```
//!
//! A device's variant is decided once, at load time, by the shape of its
//! property bag. After that the catalog never changes for the lifetime of
//! the process.

pub mod error;
pub mod model;
pub mod schema;
pub mod store;

pub use error::{ConfigurationError, UnknownDeviceError};
pub use model::{CodeDevice, Device, StatefulDevice, SystemDevice, DEFAULT_RESEND};
pub use store::{DeviceCatalog, DeviceStore};
