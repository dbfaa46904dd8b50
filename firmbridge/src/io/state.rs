//! Last known values of the device pins.

use crate::io::firmata::constants::{MAX_ANALOG_VALUE, MAX_PINS, PORT_COUNT};
use crate::io::PinModeId;
use crate::utils::Scalable;

/// Holds the last sampled inputs and the last commanded outputs of the device.
///
/// Inputs are overwritten by the inbound reports; outputs are only touched by the command encoder.
/// Every read is a plain array lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinStateStore {
    /// Last reported level of the 8 pins of each port.
    digital_input: [u8; PORT_COUNT],
    /// Last reported raw sample of each analog channel.
    analog_input: [u16; PORT_COUNT],
    /// Last written level of the 8 pins of each port.
    digital_output: [u8; PORT_COUNT],
    /// Last `(mode, value)` written to each pin.
    last_written: [Option<(PinModeId, u16)>; MAX_PINS],
    /// Last mode commanded to each pin.
    modes: [Option<PinModeId>; MAX_PINS],
}

impl Default for PinStateStore {
    fn default() -> Self {
        Self {
            digital_input: [0; PORT_COUNT],
            analog_input: [0; PORT_COUNT],
            digital_output: [0; PORT_COUNT],
            last_written: [None; MAX_PINS],
            modes: [None; MAX_PINS],
        }
    }
}

impl PinStateStore {
    // ########################################
    // Inputs

    pub fn update_digital_port(&mut self, port: u8, bitmask: u8) {
        if let Some(levels) = self.digital_input.get_mut(usize::from(port)) {
            *levels = bitmask;
        }
    }

    pub fn update_analog_channel(&mut self, channel: u8, value: u16) {
        if let Some(sample) = self.analog_input.get_mut(usize::from(channel)) {
            *sample = value;
        }
    }

    /// Last reported level of a digital pin.
    pub fn digital_level(&self, pin: u8) -> bool {
        let levels = self
            .digital_input
            .get(usize::from(pin >> 3))
            .copied()
            .unwrap_or_default();
        (levels >> (pin & 0x07)) & 0x01 == 1
    }

    /// Last reported raw sample (0..1023) of an analog channel.
    pub fn analog_raw(&self, channel: u8) -> u16 {
        self.analog_input
            .get(usize::from(channel))
            .copied()
            .unwrap_or_default()
    }

    /// Last reported sample of an analog channel, rescaled to 0..100 (rounded).
    pub fn analog_percent(&self, channel: u8) -> u8 {
        self.analog_raw(channel)
            .min(MAX_ANALOG_VALUE)
            .scale(0, MAX_ANALOG_VALUE, 0, 100) as u8
    }

    // ########################################
    // Outputs

    /// Current output bitmask of a port.
    pub fn port_output(&self, port: u8) -> u8 {
        self.digital_output
            .get(usize::from(port))
            .copied()
            .unwrap_or_default()
    }

    /// Computes the bitmask of the pin port once `level` is applied to the pin: the shadow is left
    /// untouched.
    ///
    /// # Returns
    /// The `(port, bitmask)` couple to be written.
    pub fn output_with(&self, pin: u8, level: bool) -> (u8, u8) {
        let port = pin >> 3;
        let bit = 1u8 << (pin & 0x07);
        let bitmask = match level {
            true => self.port_output(port) | bit,
            false => self.port_output(port) & !bit,
        };
        (port, bitmask)
    }

    /// Applies `level` to the pin in the port shadow.
    pub fn set_output_level(&mut self, pin: u8, level: bool) {
        let (port, bitmask) = self.output_with(pin, level);
        if let Some(shadow) = self.digital_output.get_mut(usize::from(port)) {
            *shadow = bitmask;
        }
    }

    /// Last mode commanded to the pin.
    pub fn mode(&self, pin: u8) -> Option<PinModeId> {
        self.modes.get(usize::from(pin)).copied().flatten()
    }

    /// Records the mode commanded to the pin. A new mode forgets the last value written.
    ///
    /// # Returns
    /// Whether the mode changed.
    pub fn set_mode(&mut self, pin: u8, mode: PinModeId) -> bool {
        let index = usize::from(pin);
        match self.modes.get_mut(index) {
            Some(current) if *current != Some(mode) => {
                *current = Some(mode);
                if let Some(written) = self.last_written.get_mut(index) {
                    *written = None;
                }
                true
            }
            _ => false,
        }
    }

    /// Last `(mode, value)` written to the pin.
    pub fn last_written(&self, pin: u8) -> Option<(PinModeId, u16)> {
        self.last_written.get(usize::from(pin)).copied().flatten()
    }

    pub fn record_write(&mut self, pin: u8, mode: PinModeId, value: u16) {
        if let Some(written) = self.last_written.get_mut(usize::from(pin)) {
            *written = Some((mode, value));
        }
    }

    /// Forgets everything: used when the connection goes up or down.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
