//! Stateless conversions between logical values and Firmata wire bytes.
//!
//! Every data byte on the wire is 7-bit: a byte with the high bit set is always a command (outside
//! of a SysEx payload), which is why multibyte values are split in 7-bit chunks, least significant
//! first.
//! <https://github.com/firmata/protocol/blob/master/protocol.md#message-types>

use crate::errors::{Error, ProtocolError};
use crate::io::firmata::constants::*;
use crate::io::{PinMode, PinModeId};

/// Encodes a 14-bit value as two 7-bit bytes, least significant first.
///
/// Bits above the 14th are dropped.
pub fn encode_u14(value: u16) -> [u8; 2] {
    [
        value as u8 & SYSEX_REALTIME,
        (value >> 7) as u8 & SYSEX_REALTIME,
    ]
}

/// Decodes two 7-bit bytes (least significant first) into a 14-bit value.
pub fn decode_u14(lsb: u8, msb: u8) -> u16 {
    u16::from(lsb & SYSEX_REALTIME) | (u16::from(msb & SYSEX_REALTIME) << 7)
}

// ########################################
// Outbound frames

/// SET_PIN_MODE (0xF4): `{0xF4, pin, mode}`.
pub fn set_pin_mode(pin: u8, mode: PinModeId) -> [u8; 3] {
    [SET_PIN_MODE, pin & SYSEX_REALTIME, mode.into()]
}

/// DIGITAL_MESSAGE (0x90): writes the whole 8-pin `port` at once.
pub fn digital_port_write(port: u8, bitmask: u8) -> [u8; 3] {
    let [lsb, msb] = encode_u14(u16::from(bitmask));
    [DIGITAL_MESSAGE | (port & 0x0F), lsb, msb]
}

/// ANALOG_MESSAGE (0xE0) for pins 0 to 15, EXTENDED_ANALOG (SysEx 0x6F) above.
///
/// The short message can only address a pin through its low nibble: writing pin 16 with it would
/// drive pin 0 instead.
pub fn analog_write(pin: u8, value: u16) -> Vec<u8> {
    let [lsb, msb] = encode_u14(value);
    match pin {
        0..=15 => vec![ANALOG_MESSAGE | pin, lsb, msb],
        _ => vec![
            START_SYSEX,
            EXTENDED_ANALOG,
            pin & SYSEX_REALTIME,
            lsb,
            msb,
            END_SYSEX,
        ],
    }
}

/// REPORT_ANALOG (0xC0): toggles the periodic report of an analog `channel`.
pub fn report_analog(channel: u8, enable: bool) -> [u8; 2] {
    [REPORT_ANALOG | (channel & 0x0F), u8::from(enable)]
}

/// REPORT_DIGITAL (0xD0): toggles the report of all pins in a `port`.
pub fn report_digital(port: u8, enable: bool) -> [u8; 2] {
    [REPORT_DIGITAL | (port & 0x0F), u8::from(enable)]
}

/// A SysEx message with no payload: `{0xF0, query, 0xF7}`.
pub fn sysex_query(query: u8) -> [u8; 3] {
    [START_SYSEX, query & SYSEX_REALTIME, END_SYSEX]
}

/// SAMPLING_INTERVAL (SysEx 0x7A): how often (ms) the device reports analog values.
pub fn sampling_interval(interval: u16) -> [u8; 5] {
    let [lsb, msb] = encode_u14(interval);
    [START_SYSEX, SAMPLING_INTERVAL, lsb, msb, END_SYSEX]
}

/// SYSTEM_RESET (0xFF).
pub fn system_reset() -> [u8; 1] {
    [SYSTEM_RESET]
}

// ########################################
// Inbound opcodes

/// A command byte, as classified by [`classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// 0x90-0x9F: digital port report (channel = port).
    DigitalReport,
    /// 0xE0-0xEF: analog channel report (channel = analog channel).
    AnalogReport,
    /// 0xF9: protocol version report.
    VersionReport,
    /// 0xF0
    StartSysex,
    /// 0xF7
    EndSysex,
    /// Anything this engine does not decode.
    Other(u8),
}

impl Command {
    /// Number of data bytes following the command, for the fixed-size messages.
    pub fn data_len(&self) -> Option<u8> {
        match self {
            Command::DigitalReport | Command::AnalogReport | Command::VersionReport => Some(2),
            _ => None,
        }
    }
}

/// Splits a command byte into its command and channel.
///
/// Below 0xF0 the high nibble is the command and the low nibble the channel; from 0xF0 the whole
/// byte is the command (and the channel is 0).
pub fn classify(byte: u8) -> (Command, u8) {
    let (command, channel) = match byte < START_SYSEX {
        true => (byte & 0xF0, byte & 0x0F),
        false => (byte, 0),
    };
    let command = match command {
        DIGITAL_MESSAGE => Command::DigitalReport,
        ANALOG_MESSAGE => Command::AnalogReport,
        REPORT_VERSION => Command::VersionReport,
        START_SYSEX => Command::StartSysex,
        END_SYSEX => Command::EndSysex,
        other => Command::Other(other),
    };
    (command, channel)
}

// ########################################
// SysEx payloads (command byte excluded)

/// Decodes a CAPABILITY_RESPONSE payload into the supported modes of each pin.
///
/// Each pin is a list of `(mode, resolution)` pairs closed by 0x7F. Decoding stops when the payload
/// is exhausted or after [`MAX_PINS`] pins.
/// <https://github.com/firmata/protocol/blob/master/protocol.md#capability-query>
pub fn decode_capabilities(payload: &[u8]) -> Vec<Vec<PinMode>> {
    let mut pins: Vec<Vec<PinMode>> = vec![];
    let mut modes: Vec<PinMode> = vec![];
    let mut i = 0;

    while i < payload.len() && pins.len() < MAX_PINS {
        if payload[i] == SYSEX_REALTIME {
            pins.push(std::mem::take(&mut modes));
            i += 1;
        } else {
            modes.push(PinMode {
                mode: payload[i],
                resolution: payload.get(i + 1).copied().unwrap_or_default(),
            });
            i += 2;
        }
    }

    // A truncated last pin still counts.
    if !modes.is_empty() && pins.len() < MAX_PINS {
        pins.push(modes);
    }
    pins
}

/// Decodes a REPORT_FIRMWARE payload: `major`, `minor` and the firmware name, sent as 14-bit
/// characters.
/// <https://github.com/firmata/protocol/blob/master/protocol.md#query-firmware-name-and-version>
pub fn decode_firmware(payload: &[u8]) -> Result<(u8, u8, String), Error> {
    if payload.len() < 2 {
        return Err(Error::from(ProtocolError::MessageTooShort {
            operation: "decode_firmware",
            expected: 2,
            received: payload.len(),
        }));
    }
    let name = payload[2..]
        .chunks(2)
        .map(|chunk| decode_u14(chunk[0], chunk.get(1).copied().unwrap_or_default()))
        .filter_map(|code| char::from_u32(u32::from(code)))
        .filter(|c| *c != '\0')
        .collect();
    Ok((payload[0], payload[1], name))
}
