//! Incremental decoder for the inbound Firmata byte stream.
//!
//! The transport delivers bytes in chunks of any size: the [`StreamParser`] consumes them one at a
//! time and keeps between calls only what is needed to resume in the middle of a message. Feeding
//! a stream at once or split at any boundary yields the same [`Message`]s.

use log::trace;

use crate::errors::{Error, ProtocolError};
use crate::io::firmata::codec::{
    classify, decode_capabilities, decode_firmware, decode_u14, Command,
};
use crate::io::firmata::constants::*;
use crate::io::PinMode;

/// A decoded inbound protocol message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// DIGITAL_MESSAGE (0x90): input levels of the 8 pins of `port`.
    DigitalPortReport { port: u8, bitmask: u8 },
    /// ANALOG_MESSAGE (0xE0): raw sample of an analog `channel`.
    AnalogPinReport { channel: u8, value: u16 },
    /// REPORT_VERSION (0xF9): the protocol version implemented by the firmware.
    VersionReport { major: u8, minor: u8 },
    /// CAPABILITY_RESPONSE (SysEx 0x6C): supported modes, per pin.
    CapabilityReport { pins: Vec<Vec<PinMode>> },
    /// ANALOG_MAPPING_RESPONSE (SysEx 0x6A): analog channel of each pin (127: none).
    AnalogMappingReport { channels: Vec<u8> },
    /// REPORT_FIRMWARE (SysEx 0x79): answer to a firmware query.
    FirmwareReport { major: u8, minor: u8, name: String },
}

/// Where the parser stands in the byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParserState {
    /// Waiting for a command byte.
    #[default]
    Idle,
    /// A fixed-size command was received: `remaining` data bytes are still expected.
    AwaitingData {
        command: Command,
        channel: u8,
        remaining: u8,
    },
    /// Accumulating a SysEx payload until END_SYSEX.
    InSysex,
}

/// Firmata stream state machine.
#[derive(Debug, Clone)]
pub struct StreamParser {
    state: ParserState,
    /// Data bytes of the pending fixed-size command, in arrival order.
    data: [u8; 2],
    /// Pending SysEx payload: never grows over [`MAX_DATA_BYTES`].
    sysex: Vec<u8>,
}

impl Default for StreamParser {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamParser {
    pub fn new() -> Self {
        Self {
            state: ParserState::Idle,
            data: [0; 2],
            sysex: Vec::with_capacity(MAX_DATA_BYTES),
        }
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    /// Drops any partially received message.
    pub fn reset(&mut self) {
        self.state = ParserState::Idle;
        self.data = [0; 2];
        self.sysex.clear();
    }

    /// Consumes a chunk of bytes and returns what was decoded, in arrival order.
    ///
    /// Errors do not stop the decoding: the faulty message is dropped and parsing goes on with the
    /// next byte.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Result<Message, Error>> {
        bytes
            .iter()
            .filter_map(|byte| self.push(*byte).transpose())
            .collect()
    }

    /// Consumes one byte.
    ///
    /// # Returns
    /// * `Ok(Some(message))` when the byte completes a message.
    /// * `Ok(None)` when more bytes are needed (or the byte was ignored).
    ///
    /// # Errors
    /// * `BufferOverflow`: the SysEx payload exceeds [`MAX_DATA_BYTES`]. The payload is discarded
    ///   and the parser waits for the next command.
    /// * `MessageTooShort`: a SysEx message ended before its mandatory fields.
    pub fn push(&mut self, byte: u8) -> Result<Option<Message>, Error> {
        match self.state {
            ParserState::InSysex => self.push_sysex(byte),
            ParserState::AwaitingData {
                command,
                channel,
                remaining,
            } if byte < 0x80 => {
                let expected = command.data_len().unwrap_or(2);
                self.data[usize::from(expected - remaining)] = byte;
                match remaining > 1 {
                    true => {
                        self.state = ParserState::AwaitingData {
                            command,
                            channel,
                            remaining: remaining - 1,
                        };
                        Ok(None)
                    }
                    false => {
                        self.state = ParserState::Idle;
                        Ok(Some(self.decode_data(command, channel)))
                    }
                }
            }
            _ if byte < 0x80 => {
                trace!("Ignored data byte outside of any message: 0x{:02X}", byte);
                Ok(None)
            }
            _ => {
                if let ParserState::AwaitingData { command, .. } = self.state {
                    trace!("{:?} interrupted by command byte 0x{:02X}", command, byte);
                }
                self.start_command(byte);
                Ok(None)
            }
        }
    }

    fn start_command(&mut self, byte: u8) {
        let (command, channel) = classify(byte);
        self.state = match command {
            Command::DigitalReport | Command::AnalogReport | Command::VersionReport => {
                ParserState::AwaitingData {
                    command,
                    channel,
                    remaining: command.data_len().unwrap_or(2),
                }
            }
            Command::StartSysex => {
                self.sysex.clear();
                ParserState::InSysex
            }
            Command::EndSysex | Command::Other(_) => {
                trace!("Ignored command byte: 0x{:02X}", byte);
                ParserState::Idle
            }
        };
    }

    fn push_sysex(&mut self, byte: u8) -> Result<Option<Message>, Error> {
        if byte == END_SYSEX {
            self.state = ParserState::Idle;
            let message = self.decode_sysex();
            self.sysex.clear();
            return message;
        }
        if self.sysex.len() >= MAX_DATA_BYTES {
            self.reset();
            return Err(Error::from(ProtocolError::BufferOverflow {
                capacity: MAX_DATA_BYTES,
            }));
        }
        self.sysex.push(byte);
        Ok(None)
    }

    fn decode_data(&self, command: Command, channel: u8) -> Message {
        let value = decode_u14(self.data[0], self.data[1]);
        match command {
            Command::DigitalReport => Message::DigitalPortReport {
                port: channel,
                bitmask: (value & 0xFF) as u8,
            },
            Command::AnalogReport => Message::AnalogPinReport { channel, value },
            _ => Message::VersionReport {
                major: self.data[0],
                minor: self.data[1],
            },
        }
    }

    /// Dispatches a complete SysEx payload on its first byte.
    fn decode_sysex(&self) -> Result<Option<Message>, Error> {
        let Some((&command, payload)) = self.sysex.split_first() else {
            trace!("Ignored empty SysEx message");
            return Ok(None);
        };
        let message = match command {
            CAPABILITY_RESPONSE => Some(Message::CapabilityReport {
                pins: decode_capabilities(payload),
            }),
            ANALOG_MAPPING_RESPONSE => Some(Message::AnalogMappingReport {
                channels: payload.iter().take(MAX_PINS).copied().collect(),
            }),
            REPORT_FIRMWARE => {
                let (major, minor, name) = decode_firmware(payload)?;
                Some(Message::FirmwareReport { major, minor, name })
            }
            other => {
                trace!("Ignored SysEx message 0x{:02X} ({} bytes)", other, payload.len());
                None
            }
        };
        Ok(message)
    }
}
