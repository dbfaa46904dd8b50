//! Pin capabilities as self-reported by the device.

use log::{trace, warn};

use crate::io::firmata::constants::{MAX_PINS, PORT_COUNT, UNMAPPED_CHANNEL};
use crate::io::{ModeSet, PinMode, PinModeId};

/// Knows which modes each pin supports and which pin hides behind each analog channel.
///
/// Populated by the capability handshake: a capability report first, then the analog mapping.
/// Both are discarded when the connection goes down.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilityRegistry {
    /// Supported modes, indexed by pin id.
    pins: Vec<ModeSet>,
    /// Physical pin of each analog channel.
    channels: [Option<u8>; PORT_COUNT],
}

impl CapabilityRegistry {
    /// Replaces the known pins with the content of a capability report.
    ///
    /// Resolutions are dropped: only the mode bytes are retained, unknown ones included. The analog
    /// mapping is reset as well since it refers to the previous pin list.
    pub fn load_capabilities(&mut self, pins: &[Vec<PinMode>]) {
        self.pins = pins
            .iter()
            .take(MAX_PINS)
            .map(|modes| modes.iter().map(|mode| mode.mode).collect())
            .collect();
        self.channels = [None; PORT_COUNT];
        trace!("Capabilities loaded for {} pins", self.pins.len());
    }

    /// Loads an analog mapping payload: byte `i` holds the channel of pin `i`, or 127 for none.
    ///
    /// # Returns
    /// The mapped channels, in increasing order.
    pub fn load_analog_mapping(&mut self, mapping: &[u8]) -> Vec<u8> {
        self.channels = [None; PORT_COUNT];
        for (pin, &channel) in mapping.iter().take(MAX_PINS).enumerate() {
            if channel == UNMAPPED_CHANNEL {
                continue;
            }
            match self.channels.get_mut(usize::from(channel)) {
                Some(slot) => *slot = Some(pin as u8),
                None => warn!(
                    "Pin {} maps to analog channel {}: channel cannot be reported, ignored",
                    pin, channel
                ),
            }
        }
        self.channels()
    }

    /// Checks if the pin is known and supports the mode.
    pub fn has_capability(&self, pin: u8, mode: PinModeId) -> bool {
        self.modes(pin).is_some_and(|modes| modes.contains(mode))
    }

    /// Returns the modes supported by the pin, `None` for unknown pins.
    pub fn modes(&self, pin: u8) -> Option<ModeSet> {
        self.pins.get(usize::from(pin)).copied()
    }

    /// Returns the physical pin behind the analog channel.
    pub fn channel_pin(&self, channel: u8) -> Option<u8> {
        self.channels.get(usize::from(channel)).copied().flatten()
    }

    /// Returns the analog channel the pin is mapped to.
    pub fn pin_channel(&self, pin: u8) -> Option<u8> {
        self.channels
            .iter()
            .position(|mapped| *mapped == Some(pin))
            .map(|channel| channel as u8)
    }

    /// Lists the mapped analog channels.
    pub fn channels(&self) -> Vec<u8> {
        self.channels
            .iter()
            .enumerate()
            .filter(|(_, pin)| pin.is_some())
            .map(|(channel, _)| channel as u8)
            .collect()
    }

    /// Number of pins described by the capability report.
    pub fn pin_count(&self) -> usize {
        self.pins.len()
    }

    /// Checks if a capability report has been loaded.
    pub fn is_populated(&self) -> bool {
        !self.pins.is_empty()
    }

    pub fn clear(&mut self) {
        self.pins.clear();
        self.channels = [None; PORT_COUNT];
    }
}

#[cfg(test)]
mod tests {
    use crate::io::firmata::codec::decode_capabilities;
    use crate::io::{CapabilityRegistry, PinModeId};

    fn create_test_registry() -> CapabilityRegistry {
        let mut registry = CapabilityRegistry::default();
        registry.load_capabilities(&decode_capabilities(&[
            0x02, 0x01, 0x04, 0x01, 0x7F, // pin 0: ANALOG, SERVO
            0x01, 0x01, 0x7F, // pin 1: OUTPUT
        ]));
        registry
    }

    #[test]
    fn test_has_capability() {
        let registry = create_test_registry();
        assert_eq!(registry.pin_count(), 2);
        assert!(registry.is_populated());
        assert!(registry.has_capability(0, PinModeId::ANALOG));
        assert!(registry.has_capability(0, PinModeId::SERVO));
        assert!(!registry.has_capability(0, PinModeId::OUTPUT));
        assert!(registry.has_capability(1, PinModeId::OUTPUT));
        assert!(!registry.has_capability(2, PinModeId::OUTPUT));
        assert!(registry.modes(2).is_none());
    }

    #[test]
    fn test_unknown_modes_are_kept() {
        let mut registry = CapabilityRegistry::default();
        registry.load_capabilities(&decode_capabilities(&[0x42, 0x01, 0x03, 0x08, 0x7F]));
        let modes = registry.modes(0).unwrap();
        assert!(modes.contains_raw(0x42));
        assert!(modes.contains(PinModeId::PWM));
        assert_eq!(modes.len(), 2);
    }

    #[test]
    fn test_pins_without_modes() {
        let mut registry = CapabilityRegistry::default();
        registry.load_capabilities(&decode_capabilities(&[0x7F, 0x01, 0x01, 0x7F]));
        assert_eq!(registry.pin_count(), 2);
        assert!(registry.modes(0).unwrap().is_empty());
        assert!(registry.has_capability(1, PinModeId::OUTPUT));
    }

    #[test]
    fn test_analog_mapping() {
        let mut registry = create_test_registry();
        let channels = registry.load_analog_mapping(&[127, 127, 0, 127]);
        assert_eq!(channels, vec![0]);
        assert_eq!(registry.channel_pin(0), Some(2));
        assert_eq!(registry.pin_channel(2), Some(0));
        assert_eq!(registry.channel_pin(1), None);
        assert_eq!(registry.pin_channel(0), None);
        assert_eq!(registry.channel_pin(200), None);
    }

    #[test]
    fn test_analog_mapping_replaces_previous_one() {
        let mut registry = create_test_registry();
        registry.load_analog_mapping(&[127, 127, 0, 1]);
        assert_eq!(registry.channels(), vec![0, 1]);

        // Channel 20 cannot be addressed: ignored.
        let channels = registry.load_analog_mapping(&[2, 20]);
        assert_eq!(channels, vec![2]);
        assert_eq!(registry.channel_pin(0), None);
        assert_eq!(registry.channel_pin(2), Some(0));
    }

    #[test]
    fn test_new_capabilities_reset_mapping() {
        let mut registry = create_test_registry();
        registry.load_analog_mapping(&[0, 1]);
        registry.load_capabilities(&decode_capabilities(&[0x01, 0x01, 0x7F]));
        assert!(registry.channels().is_empty());
    }

    #[test]
    fn test_clear() {
        let mut registry = create_test_registry();
        registry.load_analog_mapping(&[0, 1]);
        registry.clear();
        assert!(!registry.is_populated());
        assert!(registry.channels().is_empty());
        assert!(!registry.has_capability(1, PinModeId::OUTPUT));
    }
}
