//! Defines the Firmata protocol engine: the wire format, the stream decoding and the device model
//! it feeds.

mod aliases;
mod capabilities;
mod data;
pub mod firmata;
mod state;
mod transports;

use crate::errors::Error;
pub use aliases::*;
pub use capabilities::*;
pub use data::*;
pub use firmata::*;
pub use state::*;
pub use transports::serial::{Serial, SerialConfig};
pub use transports::*;

/// The operations a block-programming host drives a device with.
///
/// Pins are wire pin numbers here: names and aliases are resolved by the
/// [`Board`](crate::hardware::Board) before reaching this layer. Every write validates the pin
/// capabilities first: on failure nothing is sent and a `CapabilityViolation` is returned.
pub trait IO {
    /// Checks if the handshake completed and the device answers.
    fn is_connected(&self) -> bool;

    // ########################################
    // Read/Write on pins

    /// Drives the digital `pin` to `level`.
    ///
    /// Sends a SET_PIN_MODE (0xF4 - OUTPUT) unless already done, then a DIGITAL_MESSAGE (0x90)
    /// carrying the whole port. Nothing is sent when the pin already holds that level.
    /// <https://github.com/firmata/protocol/blob/master/protocol.md#message-types>
    fn set_digital_output(&mut self, pin: u8, level: bool) -> Result<(), Error>;

    /// Drives the PWM `pin` to `percent` (clamped to 0..100) of its duty cycle.
    ///
    /// Sends a SET_PIN_MODE (0xF4 - PWM) unless already done, then an ANALOG_MESSAGE (0xE0) with the
    /// duty cycle rescaled to 0..255.
    fn set_analog_output(&mut self, pin: u8, percent: f64) -> Result<(), Error>;

    /// Moves the servo on `pin` to `degrees` (clamped to 0..180).
    fn set_servo_angle(&mut self, pin: u8, degrees: f64) -> Result<(), Error>;

    /// Switches the `pin` to INPUT (unless already done) and returns its last reported level.
    ///
    /// # Notes
    /// The level comes from the last digital report received: it lags behind the pin by one
    /// report at most.
    fn read_digital_input(&mut self, pin: u8) -> Result<bool, Error>;

    /// Returns the last sample of the analog `channel`, rescaled to 0..100.
    fn read_analog_input(&self, channel: u8) -> Result<u8, Error>;

    /// Same as [`IO::read_analog_input`] through the channel the `pin` is mapped to.
    fn read_analog_pin(&self, pin: u8) -> Result<u8, Error>;

    // ########################################
    // Queries

    /// Sends a CAPABILITY_QUERY (0x6B).
    /// <https://github.com/firmata/protocol/blob/master/protocol.md#capability-query>
    fn query_capabilities(&mut self) -> Result<(), Error>;

    /// Sends an ANALOG_MAPPING_QUERY (0x69).
    /// <https://github.com/firmata/protocol/blob/master/protocol.md#analog-mapping-query>
    fn query_analog_mapping(&mut self) -> Result<(), Error>;

    /// Sends a REPORT_FIRMWARE query (0x79): the answer doubles as the liveness acknowledgment.
    /// <https://github.com/firmata/protocol/blob/master/protocol.md#query-firmware-name-and-version>
    fn query_firmware(&mut self) -> Result<(), Error>;

    // ########################################
    // Reporting

    /// Sets the digital reporting `state` of the 8 pins of `port`.
    fn report_digital(&mut self, port: u8, state: bool) -> Result<(), Error>;

    /// Sets the reporting `state` of the analog `channel`.
    fn report_analog(&mut self, channel: u8, state: bool) -> Result<(), Error>;

    /// Sets the sampling interval (in ms).
    ///
    /// The sampling interval sets how often analog data is reported to the client. The default for
    /// the arduino implementation is 19ms.
    /// <https://github.com/firmata/protocol/blob/master/protocol.md#sampling-interval>
    fn sampling_interval(&mut self, interval: u16) -> Result<(), Error>;

    /// Sends a SYSTEM_RESET (0xFF).
    fn software_reset(&mut self) -> Result<(), Error>;
}
