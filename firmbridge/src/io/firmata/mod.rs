//! Official Firmata documentation: https://github.com/firmata/protocol
//! Helper unofficial documentation: https://github.com/martin-eden/firmata_protocol/blob/main/protocol.md

pub mod codec;
pub mod constants;
mod encoder;
pub mod parser;

use std::fmt::{Display, Formatter};

use log::{debug, error, info, trace, warn};
use tokio::sync::watch;

use crate::errors::{Error, ProtocolError};
use crate::io::firmata::constants::PORT_COUNT;
use crate::io::{
    CapabilityRegistry, IoTransport, PinAliases, PinIdOrName, PinStateStore, Serial, IO,
};
use crate::utils::format_as_hex;
pub use parser::{Message, ParserState, StreamParser};

/// Number of unanswered heartbeats after which the device is considered gone.
pub const DEFAULT_MAX_MISSED_HEARTBEATS: u8 = 6;
/// Size of the buffer a single poll reads into.
const READ_CHUNK_SIZE: usize = 256;

/// Connection lifecycle of a [`Firmata`] session.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    #[default]
    Disconnected,
    /// The transport is opened: firmware queries are sent until the device answers.
    ProbingFirmware,
    /// The device answered: waiting for its capability report.
    CapabilitiesRequested,
    /// Capabilities are known: waiting for the analog mapping.
    AnalogMappingRequested,
    /// Handshake completed: the device is usable and watched by heartbeats.
    Connected,
}

impl LinkState {
    pub fn is_connected(&self) -> bool {
        matches!(self, LinkState::Connected)
    }

    /// Checks if the handshake is in progress.
    pub fn is_handshaking(&self) -> bool {
        matches!(
            self,
            LinkState::ProbingFirmware
                | LinkState::CapabilitiesRequested
                | LinkState::AnalogMappingRequested
        )
    }
}

impl Display for LinkState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Implements the [Firmata protocol](https://github.com/firmata/protocol) over an [`IoTransport`].
///
/// The session is fully synchronous: inbound bytes are pushed with [`Firmata::receive`] (or pulled
/// from the transport with [`Firmata::poll`]), commands are sent through the [`IO`] trait and the
/// liveness is driven by calling [`Firmata::heartbeat`] periodically. Scheduling these calls is the
/// job of the [`Board`](crate::hardware::Board).
#[derive(Debug)]
pub struct Firmata {
    /// Transport layer used to communicate with the device.
    transport: Box<dyn IoTransport>,
    parser: StreamParser,
    registry: CapabilityRegistry,
    state: PinStateStore,
    /// Outlives the connection.
    aliases: PinAliases,
    link: watch::Sender<LinkState>,

    // ########################################
    // # Device identity (per connection).
    protocol_version: Option<(u8, u8)>,
    firmware_version: Option<(u8, u8)>,
    firmware_name: String,

    // ########################################
    // # Liveness.
    probe_pending: bool,
    missed_heartbeats: u8,
    max_missed_heartbeats: u8,
}

impl Default for Firmata {
    /// Creates a session over the first available serial port.
    fn default() -> Self {
        Self::from(Serial::default())
    }
}

impl Firmata {
    /// Creates a session over the given serial port.
    pub fn new<P: Into<String>>(port: P) -> Self {
        Self::from(Serial::new(port))
    }

    pub fn with_max_missed_heartbeats(mut self, max: u8) -> Self {
        self.max_missed_heartbeats = max;
        self
    }

    pub fn set_max_missed_heartbeats(&mut self, max: u8) {
        self.max_missed_heartbeats = max;
    }

    // ########################################
    // Accessors

    pub fn get_transport(&self) -> &dyn IoTransport {
        self.transport.as_ref()
    }

    pub fn link_state(&self) -> LinkState {
        *self.link.borrow()
    }

    /// Returns a receiver notified of every [`LinkState`] change.
    pub fn subscribe(&self) -> watch::Receiver<LinkState> {
        self.link.subscribe()
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    pub fn pin_state(&self) -> &PinStateStore {
        &self.state
    }

    pub fn aliases(&self) -> &PinAliases {
        &self.aliases
    }

    /// Protocol version announced by the device (REPORT_VERSION).
    pub fn protocol_version(&self) -> Option<(u8, u8)> {
        self.protocol_version
    }

    /// Firmware version from the last firmware report.
    pub fn firmware_version(&self) -> Option<(u8, u8)> {
        self.firmware_version
    }

    pub fn firmware_name(&self) -> &str {
        &self.firmware_name
    }

    // ########################################
    // Pin naming

    /// Names a pin. See [`PinAliases::register`].
    pub fn register_alias<S: Into<String>>(&mut self, name: S, pin: u8) -> Result<(), Error> {
        self.aliases.register(name, pin, &self.registry)
    }

    /// Resolves a pin id, alias or board name into a wire pin number.
    pub fn resolve<P: Into<PinIdOrName>>(&self, pin: P) -> Result<u8, Error> {
        self.aliases.resolve(&pin.into(), &self.registry)
    }

    // ########################################
    // Lifecycle

    /// Opens the transport and starts the handshake: the device is reset and probed for its
    /// firmware. The handshake then moves on as the answers come in through [`Firmata::receive`].
    ///
    /// A previous connection is torn down first.
    pub fn open(&mut self) -> Result<(), Error> {
        self.teardown();
        self.transport.open()?;
        self.set_link(LinkState::ProbingFirmware);

        // Some boards do not restart when the connection opens: reporting left active by a previous
        // program would otherwise flood the stream.
        if let Err(error) = self.software_reset().and_then(|_| self.query_firmware()) {
            self.teardown();
            self.transport.close()?;
            return Err(error);
        }
        Ok(())
    }

    /// Re-sends the query the handshake waits an answer for.
    ///
    /// # Returns
    /// Whether the handshake is still in progress.
    pub fn retry_handshake(&mut self) -> Result<bool, Error> {
        let state = self.link_state();
        match state {
            LinkState::ProbingFirmware => self.query_firmware()?,
            LinkState::CapabilitiesRequested => self.query_capabilities()?,
            LinkState::AnalogMappingRequested => self.query_analog_mapping()?,
            LinkState::Disconnected | LinkState::Connected => return Ok(false),
        };
        debug!("Handshake still {}: query sent again", state);
        Ok(true)
    }

    /// Runs one liveness check.
    ///
    /// A firmware query is sent if none is pending, otherwise the tick counts as missed. The answer
    /// to the query (any firmware report) clears the pending state and the missed count.
    ///
    /// # Errors
    /// * `ConnectionLost`: more heartbeats were missed than allowed. The session is closed.
    pub fn heartbeat(&mut self) -> Result<(), Error> {
        if !self.is_connected() {
            return Ok(());
        }
        if !self.probe_pending {
            self.query_firmware()?;
            self.probe_pending = true;
            return Ok(());
        }

        self.missed_heartbeats = self.missed_heartbeats.saturating_add(1);
        trace!("Heartbeat missed ({})", self.missed_heartbeats);
        if self.missed_heartbeats > self.max_missed_heartbeats {
            let misses = self.missed_heartbeats;
            warn!("Device left {} heartbeats unanswered: connection lost", misses);
            self.close()?;
            return Err(ProtocolError::ConnectionLost { misses }.into());
        }
        Ok(())
    }

    /// Gracefully shuts down the connection: every per-connection state is dropped (aliases are
    /// kept).
    pub fn close(&mut self) -> Result<(), Error> {
        self.teardown();
        self.transport.close()
    }

    fn teardown(&mut self) {
        self.parser.reset();
        self.registry.clear();
        self.state.clear();
        self.protocol_version = None;
        self.firmware_version = None;
        self.firmware_name.clear();
        self.probe_pending = false;
        self.missed_heartbeats = 0;
        self.set_link(LinkState::Disconnected);
    }

    fn set_link(&mut self, state: LinkState) {
        let previous = self.link.send_replace(state);
        if previous != state {
            debug!("Link state: {} -> {}", previous, state);
        }
    }

    // ########################################
    // Inbound

    /// Reads whatever the transport has and processes it.
    ///
    /// # Returns
    /// The number of bytes read: 0 when nothing arrived.
    pub fn poll(&mut self) -> Result<usize, Error> {
        let mut buf = [0u8; READ_CHUNK_SIZE];
        let count = self.transport.read(&mut buf)?;
        if count > 0 {
            self.receive(&buf[..count])?;
        }
        Ok(count)
    }

    /// Processes a chunk of inbound bytes, cut anywhere.
    ///
    /// Malformed messages are logged and dropped. Every decoded message is handled even when an
    /// answer to a previous one could not be sent: the first of these failures is returned once
    /// the whole chunk is processed.
    pub fn receive(&mut self, bytes: &[u8]) -> Result<(), Error> {
        trace!("Received: [{}]", format_as_hex(bytes));
        let mut failure = None;
        for result in self.parser.feed(bytes) {
            match result {
                Ok(message) => {
                    if let Err(error) = self.dispatch(message) {
                        error!("Inbound message not answered: {}", error);
                        failure.get_or_insert(error);
                    }
                }
                Err(error) => error!("Inbound message dropped: {}", error),
            }
        }
        match failure {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn dispatch(&mut self, message: Message) -> Result<(), Error> {
        match message {
            Message::DigitalPortReport { port, bitmask } => {
                self.state.update_digital_port(port, bitmask);
            }
            Message::AnalogPinReport { channel, value } => {
                self.state.update_analog_channel(channel, value);
            }
            Message::VersionReport { major, minor } => {
                debug!("Protocol version: {}.{}", major, minor);
                self.protocol_version = Some((major, minor));
            }
            Message::FirmwareReport { major, minor, name } => {
                self.handle_firmware_report(major, minor, name)?;
            }
            Message::CapabilityReport { pins } => {
                // The new pin list invalidates the analog mapping: it is asked for again.
                self.registry.load_capabilities(&pins);
                match self.link_state() {
                    LinkState::Disconnected => {}
                    LinkState::CapabilitiesRequested => {
                        self.set_link(LinkState::AnalogMappingRequested);
                        self.query_analog_mapping()?;
                    }
                    _ => self.query_analog_mapping()?,
                }
            }
            Message::AnalogMappingReport { channels } => {
                self.handle_analog_mapping(&channels)?;
            }
        };
        Ok(())
    }

    fn handle_firmware_report(&mut self, major: u8, minor: u8, name: String) -> Result<(), Error> {
        self.probe_pending = false;
        self.missed_heartbeats = 0;
        if self.firmware_version != Some((major, minor)) || self.firmware_name != name {
            debug!("Firmware: {} {}.{}", name, major, minor);
        }
        self.firmware_version = Some((major, minor));
        self.firmware_name = name;

        if self.link_state() == LinkState::ProbingFirmware {
            self.set_link(LinkState::CapabilitiesRequested);
            self.query_capabilities()?;
        }
        Ok(())
    }

    /// Loads the mapping, enables the report of every mapped channel and completes the handshake
    /// when it was waiting for it.
    fn handle_analog_mapping(&mut self, mapping: &[u8]) -> Result<(), Error> {
        let handshaking = self.link_state() == LinkState::AnalogMappingRequested;

        let mut frames = vec![];
        for channel in self.registry.load_analog_mapping(mapping) {
            frames.extend(codec::report_analog(channel, true));
        }
        if handshaking {
            for port in 0..PORT_COUNT as u8 {
                frames.extend(codec::report_digital(port, true));
            }
        }
        if !frames.is_empty() {
            self.write(&frames)?;
        }

        if handshaking {
            self.probe_pending = false;
            self.missed_heartbeats = 0;
            self.set_link(LinkState::Connected);
            info!("Connected: {}", self);
        }
        Ok(())
    }

    // ########################################
    // Outbound

    /// Sends the frames of one operation in a single transport write.
    pub(crate) fn write(&mut self, frames: &[u8]) -> Result<(), Error> {
        trace!("Write: [{}]", format_as_hex(frames));
        self.transport.write(frames)
    }
}

impl<T: IoTransport + 'static> From<T> for Firmata {
    fn from(transport: T) -> Self {
        let (link, _) = watch::channel(LinkState::Disconnected);
        Self {
            transport: Box::new(transport),
            parser: StreamParser::new(),
            registry: CapabilityRegistry::default(),
            state: PinStateStore::default(),
            aliases: PinAliases::default(),
            link,
            protocol_version: None,
            firmware_version: None,
            firmware_name: String::new(),
            probe_pending: false,
            missed_heartbeats: 0,
            max_missed_heartbeats: DEFAULT_MAX_MISSED_HEARTBEATS,
        }
    }
}

fn format_version(version: Option<(u8, u8)>) -> String {
    match version {
        Some((major, minor)) => format!("{}.{}", major, minor),
        None => String::from("unknown"),
    }
}

impl Display for Firmata {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Firmata [firmware={}, version={}, protocol={}, transport={}]",
            self.firmware_name,
            format_version(self.firmware_version),
            format_version(self.protocol_version),
            self.transport
        )
    }
}
