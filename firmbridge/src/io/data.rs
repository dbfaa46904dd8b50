use std::fmt::{Debug, Display, Formatter};

/// Highest pin id a Firmata device can expose (pins are 7-bit on the wire).
pub const MAX_PIN: u8 = 127;

// ########################################

/// Enumerates the pin modes a Firmata device may advertise.
///
/// Only INPUT, OUTPUT, ANALOG, PWM and SERVO are driven by this crate: the other modes are named
/// for display purpose and otherwise carried opaquely in a [`ModeSet`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Hash)]
#[repr(u8)]
pub enum PinModeId {
    /// Same as INPUT defined in Arduino.
    INPUT = 0,
    /// Same as OUTPUT defined in Arduino.h
    OUTPUT = 1,
    /// Analog pin in analogInput mode
    ANALOG = 2,
    /// Digital pin in PWM output mode
    PWM = 3,
    /// Digital pin in Servo output mode
    SERVO = 4,
    /// shiftIn/shiftOut mode
    SHIFT = 5,
    /// Pin included in I2C setup
    I2C = 6,
    /// Pin configured for 1-wire
    ONEWIRE = 7,
    /// Pin configured for stepper motor
    STEPPER = 8,
    /// Pin configured for rotary encoders
    ENCODER = 9,
    /// Pin configured for serial communication
    SERIAL = 0x0A,
    /// Enable internal pull-up resistor for pin
    PULLUP = 0x0B,
    /// Pin configured for SPI
    SPI = 0x0C,
    /// Pin configured for proximity sensors
    SONAR = 0x0D,
    /// Pin configured for piezzo buzzer tone generation
    TONE = 0x0E,
    /// Pin configured for DHT humidity and temperature sensors
    DHT = 0x0F,
    /// Terminates a pin capability list; also used for pins to be ignored.
    #[default]
    UNSUPPORTED = 0x7F,
}

impl PinModeId {
    /// Converts a wire byte into a known `PinModeId`, `None` for vendor specific values.
    pub fn from_u8(value: u8) -> Option<PinModeId> {
        match value {
            0 => Some(PinModeId::INPUT),
            1 => Some(PinModeId::OUTPUT),
            2 => Some(PinModeId::ANALOG),
            3 => Some(PinModeId::PWM),
            4 => Some(PinModeId::SERVO),
            5 => Some(PinModeId::SHIFT),
            6 => Some(PinModeId::I2C),
            7 => Some(PinModeId::ONEWIRE),
            8 => Some(PinModeId::STEPPER),
            9 => Some(PinModeId::ENCODER),
            0x0A => Some(PinModeId::SERIAL),
            0x0B => Some(PinModeId::PULLUP),
            0x0C => Some(PinModeId::SPI),
            0x0D => Some(PinModeId::SONAR),
            0x0E => Some(PinModeId::TONE),
            0x0F => Some(PinModeId::DHT),
            0x7F => Some(PinModeId::UNSUPPORTED),
            _ => None,
        }
    }
}

impl From<PinModeId> for u8 {
    fn from(mode: PinModeId) -> u8 {
        mode as u8
    }
}

impl Display for PinModeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ########################################

/// One `(mode, resolution)` entry of a capability report.
///
/// The mode is kept as the raw wire byte so vendor specific modes survive decoding.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PinMode {
    /// Mode byte as advertised by the device.
    pub mode: u8,
    /// Resolution (number of bits) this mode uses.
    pub resolution: u8,
}

impl PinMode {
    /// Returns the known mode this entry stands for, if any.
    pub fn id(&self) -> Option<PinModeId> {
        PinModeId::from_u8(self.mode)
    }
}

impl Debug for PinMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.id() {
            Some(id) => write!(f, "[id: {}, resolution: {}]", id, self.resolution),
            None => write!(f, "[id: 0x{:02X}, resolution: {}]", self.mode, self.resolution),
        }
    }
}

// ########################################

/// The set of modes one pin supports: one bit per 7-bit mode value.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct ModeSet(u128);

impl ModeSet {
    /// Adds a raw mode byte to the set.
    pub fn insert(&mut self, mode: u8) {
        self.0 |= 1u128 << (mode & 0x7F);
    }

    /// Checks if the given mode belongs to the set.
    pub fn contains(&self, mode: PinModeId) -> bool {
        self.contains_raw(mode.into())
    }

    /// Checks if the given raw mode byte belongs to the set.
    pub fn contains_raw(&self, mode: u8) -> bool {
        mode <= 0x7F && self.0 & (1u128 << mode) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterates over the raw mode bytes of the set, in increasing order.
    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        (0..=0x7F).filter(move |mode| self.contains_raw(*mode))
    }
}

impl FromIterator<u8> for ModeSet {
    fn from_iter<T: IntoIterator<Item = u8>>(iter: T) -> Self {
        let mut set = ModeSet::default();
        iter.into_iter().for_each(|mode| set.insert(mode));
        set
    }
}

impl Debug for ModeSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.iter().map(|mode| match PinModeId::from_u8(mode) {
                Some(id) => id.to_string(),
                None => format!("0x{:02X}", mode),
            }))
            .finish()
    }
}

// ########################################

/// Defines a structure to receive either an id or a name for a pin: 1, 'D1', 'A1' or any
/// registered alias ('led' for instance).
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum PinIdOrName {
    Id(u8),
    Name(String),
}

impl From<u8> for PinIdOrName {
    fn from(n: u8) -> Self {
        PinIdOrName::Id(n)
    }
}

impl From<&str> for PinIdOrName {
    fn from(s: &str) -> Self {
        PinIdOrName::Name(s.to_string())
    }
}

impl From<String> for PinIdOrName {
    fn from(s: String) -> Self {
        PinIdOrName::Name(s)
    }
}

impl Display for PinIdOrName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PinIdOrName::Id(n) => write!(f, "{}", n),
            PinIdOrName::Name(s) => write!(f, "{:?}", s),
        }
    }
}

/// Splits a board-style pin name ('D13', 'A0') into its prefix and number.
pub(crate) fn parse_board_name(name: &str) -> Option<(char, u8)> {
    let mut chars = name.chars();
    let prefix = chars.next()?.to_ascii_uppercase();
    if prefix != 'D' && prefix != 'A' {
        return None;
    }
    let number = chars.as_str().parse::<u8>().ok()?;
    Some((prefix, number))
}
