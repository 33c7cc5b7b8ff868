//! # rc433
//!
//! Controls 433MHz radio power sockets from a Raspberry Pi and keeps their
//! on/off state in sync with an MQTT broker.
//!
//! ```text
//! caller ──► DeviceRegistry ──► RfController ──► Transmitter
//!                 │
//!                 └──► DeviceState (memory | MQTT mirrored)
//!
//! broker ──► MqttDiscovery (commands) ──► DeviceRegistry
//! broker ──► MqttState (state topics) ──► local state only
//! ```

pub mod config;
pub mod device;
pub mod factory;
pub mod mqtt;
pub mod registry;
pub mod rf;
pub mod state;

pub use config::AppConfig;
pub use registry::{DeviceRegistry, RegistryError};
