use std::sync::{Mutex, PoisonError};

use tracing::{debug, info};

use super::{RfError, Transmitter, TransmitterFactory};
use crate::device::{Device, DEFAULT_RESEND};

/// Dispatches on/off intents to the radio.
///
/// Owns the transmitter exclusively: it is opened on the first send and
/// released when the controller is dropped. Sends are serialized.
pub struct RfController {
    factory: Box<dyn TransmitterFactory>,
    transmitter: Mutex<Option<Box<dyn Transmitter>>>,
}

impl RfController {
    pub fn new(factory: impl TransmitterFactory + 'static) -> Self {
        Self {
            factory: Box::new(factory),
            transmitter: Mutex::new(None),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.transmitter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Sends `code` `times` times (at least once).
    ///
    /// Every attempt is sent; the result is `true` if any of them was
    /// acknowledged. Sockets react to the code itself rather than toggling,
    /// so duplicates are harmless and a single success is enough.
    pub fn send_code(&self, code: u64, times: u32) -> Result<bool, RfError> {
        let times = times.max(1);

        let mut slot = self.transmitter.lock().unwrap_or_else(PoisonError::into_inner);
        let transmitter = match slot.take() {
            Some(transmitter) => transmitter,
            None => {
                let transmitter = self.factory.open()?;
                info!("Transmitter initialized");
                transmitter
            }
        };
        let transmitter = slot.insert(transmitter);

        debug!("Sending code '{}' for {} times", code, times);
        let mut acknowledged = false;
        for _ in 0..times {
            acknowledged |= transmitter.transmit(code);
        }
        Ok(acknowledged)
    }

    /// Sends a raw code with the default number of repetitions
    pub fn send_default(&self, code: u64) -> Result<bool, RfError> {
        self.send_code(code, DEFAULT_RESEND)
    }

    pub fn switch_device(&self, device: &Device, on: bool) -> Result<bool, RfError> {
        debug!(
            "Device switch for '{}' to '{}' requested",
            device.device_name(),
            on
        );

        match device {
            Device::Code(device) => {
                let code = if on { device.code_on } else { device.code_off };
                self.send_code(code, device.resend)
            }
            // TODO: map system/unit codes to raw codes once the encoding per socket family is known
            other => Err(RfError::UnsupportedDevice {
                device: other.device_name().to_string(),
                variant: other.variant_tag(),
            }),
        }
    }
}

impl Drop for RfController {
    fn drop(&mut self) {
        let slot = self
            .transmitter
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(transmitter) = slot.take() {
            info!("Releasing transmitter");
            drop(transmitter);
        }
    }
}
