//! Bit-banged rc-switch transmitter on a Raspberry Pi GPIO pin.
//!
//! A code is sent most significant bit first. Every bit is a high pulse
//! followed by a low pulse whose lengths depend on the bit and the protocol;
//! the code is closed by a sync pulse and the whole frame is repeated.

use std::thread;
use std::time::Duration;

use rppal::gpio::{Gpio, OutputPin};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{RfError, Transmitter};

/// High/low durations, in multiples of the protocol's pulse length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pulse {
    pub high: u32,
    pub low: u32,
}

impl Pulse {
    const fn new(high: u32, low: u32) -> Self {
        Self { high, low }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Protocol {
    /// Default pulse length in microseconds
    pub pulse_length: u32,
    pub sync: Pulse,
    pub zero: Pulse,
    pub one: Pulse,
}

impl Protocol {
    /// The rc-switch protocol table, numbered from 1
    pub const ALL: [Protocol; 6] = [
        Protocol::new(350, Pulse::new(1, 31), Pulse::new(1, 3), Pulse::new(3, 1)),
        Protocol::new(650, Pulse::new(1, 10), Pulse::new(1, 2), Pulse::new(2, 1)),
        Protocol::new(100, Pulse::new(30, 71), Pulse::new(4, 11), Pulse::new(9, 6)),
        Protocol::new(380, Pulse::new(1, 6), Pulse::new(1, 3), Pulse::new(3, 1)),
        Protocol::new(500, Pulse::new(6, 14), Pulse::new(1, 2), Pulse::new(2, 1)),
        Protocol::new(200, Pulse::new(1, 10), Pulse::new(1, 5), Pulse::new(1, 1)),
    ];

    const fn new(pulse_length: u32, sync: Pulse, zero: Pulse, one: Pulse) -> Self {
        Self {
            pulse_length,
            sync,
            zero,
            one,
        }
    }

    pub fn by_number(number: u8) -> Option<Protocol> {
        let index = usize::from(number).checked_sub(1)?;
        Self::ALL.get(index).copied()
    }

    /// Pulses of one frame: `code_length` bits, MSB first, then sync
    pub fn frame(&self, code: u64, code_length: u32) -> Vec<Pulse> {
        let mut pulses = Vec::with_capacity(code_length as usize + 1);
        for bit in (0..code_length).rev() {
            let set = bit < u64::BITS && (code >> bit) & 1 == 1;
            pulses.push(if set { self.one } else { self.zero });
        }
        pulses.push(self.sync);
        pulses
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpioSettings {
    /// BCM pin number of the transmitter's data line
    pub pin: u8,
    /// rc-switch protocol number (1-6)
    pub protocol: u8,
    /// Overrides the protocol's pulse length, in microseconds
    pub pulse_length: Option<u32>,
    pub code_length: u32,
    /// Frames sent per transmission
    pub repeat: u32,
}

impl Default for GpioSettings {
    fn default() -> Self {
        Self {
            pin: 17,
            protocol: 1,
            pulse_length: None,
            code_length: 24,
            repeat: 10,
        }
    }
}

impl GpioSettings {
    pub fn resolve_protocol(&self) -> Result<Protocol, RfError> {
        Protocol::by_number(self.protocol).ok_or_else(|| {
            RfError::Initialization(format!("Unknown rc-switch protocol {}", self.protocol))
        })
    }
}

pub struct GpioTransmitter {
    pin: OutputPin,
    protocol: Protocol,
    pulse: Duration,
    code_length: u32,
    repeat: u32,
}

impl GpioTransmitter {
    pub fn open(settings: &GpioSettings) -> Result<Self, RfError> {
        let protocol = settings.resolve_protocol()?;
        if settings.code_length == 0 || settings.code_length > u64::BITS {
            return Err(RfError::Initialization(format!(
                "Code length must be between 1 and {}, got {}",
                u64::BITS,
                settings.code_length
            )));
        }

        let pin = Gpio::new()?.get(settings.pin)?.into_output_low();
        let pulse_length = settings.pulse_length.unwrap_or(protocol.pulse_length);
        info!(
            "Opened transmitter on GPIO {} (protocol {}, pulse length {}us)",
            settings.pin, settings.protocol, pulse_length
        );

        Ok(Self {
            pin,
            protocol,
            pulse: Duration::from_micros(u64::from(pulse_length)),
            code_length: settings.code_length,
            repeat: settings.repeat.max(1),
        })
    }

    fn wave(&mut self, pulse: Pulse) {
        self.pin.set_high();
        thread::sleep(self.pulse * pulse.high);
        self.pin.set_low();
        thread::sleep(self.pulse * pulse.low);
    }
}

impl Transmitter for GpioTransmitter {
    fn transmit(&mut self, code: u64) -> bool {
        if self.code_length < u64::BITS && code >> self.code_length != 0 {
            warn!(
                "Code {} does not fit into {} bits, upper bits are dropped",
                code, self.code_length
            );
        }

        let frame = self.protocol.frame(code, self.code_length);
        debug!("Transmitting code {} ({} frames)", code, self.repeat);
        for _ in 0..self.repeat {
            for pulse in &frame {
                self.wave(*pulse);
            }
        }
        self.pin.set_low();
        true
    }
}

impl Drop for GpioTransmitter {
    fn drop(&mut self) {
        self.pin.set_low();
        debug!("Transmitter pin released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn protocols_are_numbered_from_one() {
        assert_eq!(Protocol::by_number(0), None);
        assert_eq!(Protocol::by_number(1).map(|p| p.pulse_length), Some(350));
        assert_eq!(Protocol::by_number(6).map(|p| p.pulse_length), Some(200));
        assert_eq!(Protocol::by_number(7), None);
    }

    #[test]
    fn frame_is_msb_first_and_ends_with_sync() {
        let protocol = Protocol::ALL[0];
        let frame = protocol.frame(0b1010, 4);

        assert_eq!(
            frame,
            vec![protocol.one, protocol.zero, protocol.one, protocol.zero, protocol.sync]
        );
    }

    #[test]
    fn frame_pads_short_codes_with_zeros() {
        let protocol = Protocol::ALL[1];
        let frame = protocol.frame(1, 24);

        assert_eq!(frame.len(), 25);
        assert!(frame[..23].iter().all(|p| *p == protocol.zero));
        assert_eq!(frame[23], protocol.one);
        assert_eq!(frame[24], protocol.sync);
    }

    #[test]
    fn unknown_protocol_is_an_initialization_error() {
        let settings = GpioSettings {
            protocol: 9,
            ..GpioSettings::default()
        };

        assert!(matches!(
            settings.resolve_protocol(),
            Err(RfError::Initialization(_))
        ));
    }
}
