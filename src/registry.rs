//! Device registry
//!
//! The single entry point for callers: composes the device catalog, the state
//! backend and the RF controller. A switch is transmitted first and only
//! committed to the state backend once the transmitter acknowledged it, so the
//! tracked state never claims a switch that was not sent.

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::device::{Device, DeviceStore, StatefulDevice, UnknownDeviceError};
use crate::rf::{RfController, RfError};
use crate::state::{DeviceState, StateError};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error(transparent)]
    UnknownDevice(#[from] UnknownDeviceError),

    #[error(transparent)]
    Rf(#[from] RfError),

    #[error("Failed to initialize device state: {0}")]
    State(#[from] StateError),
}

impl RegistryError {
    /// Whether the caller asked for something that cannot be done, as
    /// opposed to a failure on our side
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownDevice(_) | Self::Rf(RfError::UnsupportedDevice { .. })
        )
    }

    /// Request field a client error refers to
    pub fn field(&self) -> Option<&'static str> {
        self.is_client_error().then_some("device_name")
    }
}

pub struct DeviceRegistry {
    store: Box<dyn DeviceStore>,
    state: Box<dyn DeviceState>,
    rf: RfController,
}

impl DeviceRegistry {
    /// Seeds the state backend with every configured device, then signals
    /// that seeding is done so listeners start against a complete device set.
    pub fn new(
        store: Box<dyn DeviceStore>,
        state: Box<dyn DeviceState>,
        rf: RfController,
    ) -> Result<Self, RegistryError> {
        let devices = store.list();
        for device in &devices {
            state.init_device(device);
        }
        state.init_done()?;
        info!("Device registry ready with {} devices", devices.len());

        Ok(Self { store, state, rf })
    }

    pub fn list(&self) -> Vec<StatefulDevice> {
        self.store
            .list()
            .into_iter()
            .map(|device| self.stateful(device))
            .collect()
    }

    pub fn lookup(&self, device_name: &str) -> Result<StatefulDevice, UnknownDeviceError> {
        let device = self.store.lookup(device_name)?;
        Ok(self.stateful(device))
    }

    /// Transmits the switch and returns whether the transmitter acknowledged
    /// it. The new state is only committed on acknowledgement.
    pub fn switch(&self, device_name: &str, on: bool) -> Result<bool, RegistryError> {
        let device = self.store.lookup(device_name)?;
        let current = self.state.lookup(device_name);
        info!(
            "Switching {} from {} to {}",
            device_name,
            on_off(current),
            on_off(on)
        );

        let acknowledged = self.rf.switch_device(device, on)?;
        if acknowledged {
            self.state.switch(device_name, on);
        } else {
            warn!(
                device = %device_name,
                "Transmission was not acknowledged, keeping state {}",
                on_off(current)
            );
        }
        Ok(acknowledged)
    }

    /// Sends a raw code, independent of any configured device
    pub fn send_code(&self, code: u64) -> Result<bool, RegistryError> {
        debug!("Sending raw code {}", code);
        Ok(self.rf.send_default(code)?)
    }

    pub fn rf(&self) -> &RfController {
        &self.rf
    }

    fn stateful(&self, device: &Device) -> StatefulDevice {
        let state = self.state.lookup(device.device_name());
        StatefulDevice::new(device.clone(), state)
    }
}

fn on_off(on: bool) -> &'static str {
    crate::mqtt::message::on_off(on)
}
