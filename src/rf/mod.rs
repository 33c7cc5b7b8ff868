//! # RF Module
//!
//! Sends 433MHz codes to power sockets.
//!
//! The radio itself is a [`Transmitter`]: something that sends one code and
//! reports whether the send was acknowledged. [`RfController`] owns at most
//! one transmitter, opens it lazily through a [`TransmitterFactory`] and maps
//! device on/off intents to codes.
//!
//! ```text
//! rf/
//! ├── controller.rs  - RfController, repeated sends and device dispatch
//! └── gpio.rs        - rppal transmitter speaking the rc-switch protocols
//! ```

pub mod controller;
pub mod gpio;

use thiserror::Error;
use tracing::info;

pub use controller::RfController;
pub use gpio::{GpioSettings, GpioTransmitter, Protocol};

#[derive(Debug, Error)]
pub enum RfError {
    /// The device variant has no code mapping in the transmission layer
    #[error("The device type '{variant}' of device '{device}' is not supported")]
    UnsupportedDevice {
        device: String,
        variant: &'static str,
    },

    #[error("Failed to initialize transmitter: {0}")]
    Initialization(String),

    #[error("GPIO error: {0}")]
    Gpio(#[from] rppal::gpio::Error),
}

/// Sends a single code over the air
pub trait Transmitter: Send {
    /// Returns whether the transmission was acknowledged by the driver
    fn transmit(&mut self, code: u64) -> bool;
}

/// Opens the transmitter on first use
pub trait TransmitterFactory: Send + Sync {
    fn open(&self) -> Result<Box<dyn Transmitter>, RfError>;
}

impl<F> TransmitterFactory for F
where
    F: Fn() -> Result<Box<dyn Transmitter>, RfError> + Send + Sync,
{
    fn open(&self) -> Result<Box<dyn Transmitter>, RfError> {
        self()
    }
}

/// Acknowledges every code without touching any hardware.
///
/// Used on hosts without an RF module attached.
#[derive(Debug, Default)]
pub struct DryRunTransmitter;

impl Transmitter for DryRunTransmitter {
    fn transmit(&mut self, code: u64) -> bool {
        info!("Dry run: not transmitting code {}", code);
        true
    }
}
