//! Device state tracking
//!
//! Tracks the last known on/off state per device name. Two backends exist:
//! [`MemoryState`] keeps a guarded map, [`MqttState`] keeps the same map
//! and mirrors it to the broker's state topics in both directions.
//!
//! State is volatile; nothing survives a restart of the process.

pub mod memory;
pub mod mqtt;

use thiserror::Error;

use crate::device::Device;
use crate::mqtt::TransportError;

pub use memory::MemoryState;
pub use mqtt::MqttState;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("Failed to start state listener: {0}")]
    Listener(#[from] TransportError),
}

pub trait DeviceState: Send + Sync {
    /// Called by the registry for every configured device before `init_done`
    fn init_device(&self, _device: &Device) {}

    /// Called once all devices are seeded; background work starts here
    fn init_done(&self) -> Result<(), StateError> {
        Ok(())
    }

    /// Last known state, `false` for devices never seen
    fn lookup(&self, device_name: &str) -> bool;

    fn switch(&self, device_name: &str, on: bool);
}
