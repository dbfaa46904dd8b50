//! Firmata protocol constants (the subset driving digital, analog and servo pins).

// ########################################
// Message command bytes (128-255/0x80-0xFF)

/// Send data for a digital port (collection of 8 pins)
pub const DIGITAL_MESSAGE: u8 = 0x90;
/// Send data for an analog pin (or PWM)
pub const ANALOG_MESSAGE: u8 = 0xE0;
/// Enable analog input by channel #
pub const REPORT_ANALOG: u8 = 0xC0;
/// Enable digital input by port
pub const REPORT_DIGITAL: u8 = 0xD0;
/// Set a pin to INPUT/OUTPUT/PWM/etc
pub const SET_PIN_MODE: u8 = 0xF4;
/// Report protocol version
pub const REPORT_VERSION: u8 = 0xF9;
/// Reset from MIDI
pub const SYSTEM_RESET: u8 = 0xFF;
/// Start a MIDI Sysex message
pub const START_SYSEX: u8 = 0xF0;
/// End a MIDI Sysex message
pub const END_SYSEX: u8 = 0xF7;

// ########################################
// Extended command set using sysex (0-127/0x00-0x7F)

/// Analog write (PWM, Servo, etc) to any pin
pub const EXTENDED_ANALOG: u8 = 0x6F;
/// Ask for mapping of analog to pin numbers
pub const ANALOG_MAPPING_QUERY: u8 = 0x69;
/// Reply with mapping info
pub const ANALOG_MAPPING_RESPONSE: u8 = 0x6A;
/// Ask for supported modes and resolution of all pins
pub const CAPABILITY_QUERY: u8 = 0x6B;
/// Reply with supported modes and resolution
pub const CAPABILITY_RESPONSE: u8 = 0x6C;
/// Query, or report, name and version of the firmware
pub const REPORT_FIRMWARE: u8 = 0x79;
/// Set the poll rate of the main loop
pub const SAMPLING_INTERVAL: u8 = 0x7A;
/// MIDI Reserved for realtime messages: also the 7-bit data mask.
pub const SYSEX_REALTIME: u8 = 0x7F;

// ########################################
// Engine limits

/// SysEx payload buffer capacity.
pub const MAX_DATA_BYTES: usize = 4096;
/// Number of pins a capability report may describe.
pub const MAX_PINS: usize = 128;
/// Number of 8-pin ports (and of analog channels) the short messages can address.
pub const PORT_COUNT: usize = 16;
/// Marks a pin without analog channel in an analog mapping response.
pub const UNMAPPED_CHANNEL: u8 = 0x7F;
/// Highest raw value an analog input reports (10-bit ADC).
pub const MAX_ANALOG_VALUE: u16 = 1023;
