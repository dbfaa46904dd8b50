use std::fmt::{Display, Formatter};
use std::io::{Read, Write};
use std::time::Duration;

use log::trace;
use parking_lot::Mutex;
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};

use crate::errors::Error;
use crate::errors::ProtocolError::NotInitialized;
use crate::io::IoTransport;

/// Firmata boards talk at 57600 bauds.
pub const DEFAULT_BAUD_RATE: u32 = 57_600;
/// Reads give up after this delay: a silent board must not hold the session.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(10);

/// Serial line settings. The frame format itself is fixed: 8 data bits, no parity, 1 stop bit and no
/// flow control.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SerialConfig {
    /// The connection port ("/dev/ttyACM0", "COM4", ...).
    pub port: String,
    pub baud_rate: u32,
    /// Read timeout.
    pub timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

impl SerialConfig {
    pub fn new<P: Into<String>>(port: P) -> Self {
        Self {
            port: port.into(),
            ..Default::default()
        }
    }

    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Serial port transport, the way Firmata boards are usually attached.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug)]
pub struct Serial {
    config: SerialConfig,
    /// A Read/Write io object.
    #[cfg_attr(feature = "serde", serde(skip))]
    io: Mutex<Option<Box<dyn SerialPort>>>,
}

impl Serial {
    /// Constructs a new `Serial` transport layer instance for communication through the specified port.
    ///
    /// # Arguments
    /// * `port` - The serial port to use for communication.
    ///
    /// # Example
    /// ```no_run
    /// use firmbridge::hardware::Board;
    /// use firmbridge::io::Serial;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let board = Board::from(Serial::new("/dev/ttyACM0"));
    ///     board.open().unwrap();
    /// }
    /// ```
    pub fn new<P: Into<String>>(port: P) -> Self {
        Self::with_config(SerialConfig::new(port))
    }

    pub fn with_config(config: SerialConfig) -> Self {
        Self {
            config,
            io: Mutex::new(None),
        }
    }

    /// Retrieves the configured port.
    pub fn get_port(&self) -> String {
        self.config.port.clone()
    }

    pub fn get_config(&self) -> &SerialConfig {
        &self.config
    }
}

impl Default for Serial {
    /// Creates a new serial transport connection with the first available port or an empty string if no ports are available.
    ///
    /// # Notes
    /// The first available port will be used, None otherwise, which will probably lead to an error
    /// during the open phase.
    #[cfg(not(tarpaulin_include))]
    fn default() -> Self {
        let ports = serialport::available_ports().unwrap_or_else(|_| vec![]);
        match ports.first() {
            Some(port) => Self::new(&port.port_name),
            None => Self::new(""),
        }
    }
}

impl Display for Serial {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Serial({})", self.config.port)
    }
}

impl IoTransport for Serial {
    #[cfg(not(tarpaulin_include))]
    fn open(&mut self) -> Result<(), Error> {
        let connexion = serialport::new(self.config.port.clone(), self.config.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(self.config.timeout)
            .open()?;
        trace!("Serial port is now opened: {:?}", connexion);

        *self.io.lock() = Some(connexion);
        Ok(())
    }

    fn close(&mut self) -> Result<(), Error> {
        *self.io.lock() = None;
        Ok(())
    }

    fn set_timeout(&mut self, duration: Duration) -> Result<(), Error> {
        self.config.timeout = duration;
        if let Some(io) = self.io.lock().as_mut() {
            io.set_timeout(duration)?;
        }
        Ok(())
    }

    fn write(&mut self, buf: &[u8]) -> Result<(), Error> {
        let mut lock = self.io.lock();
        lock.as_mut().ok_or(NotInitialized)?.write_all(buf)?;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        let mut lock = self.io.lock();
        match lock.as_mut().ok_or(NotInitialized)?.read(buf) {
            Ok(count) => Ok(count),
            Err(error)
                if matches!(
                    error.kind(),
                    std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
                ) =>
            {
                Ok(0)
            }
            Err(error) => Err(error.into()),
        }
    }
}

impl From<serialport::Error> for Error {
    fn from(value: serialport::Error) -> Self {
        std::io::Error::from(value).into()
    }
}

#[cfg(test)]
mod tests {
    use serialport::ErrorKind;

    use super::*;
    use crate::mocks::serial_port::SerialPortMock;

    fn get_test_successful_transport() -> (Serial, SerialPortMock) {
        let transport = Serial::new("/dev/ttyACM0");
        let port = SerialPortMock::default();
        *transport.io.lock() = Some(Box::new(port.clone()));
        (transport, port)
    }

    fn get_test_failing_transport() -> Serial {
        let transport = Serial::new("/dev/ttyACM0");
        *transport.io.lock() = Some(Box::new(SerialPortMock::new(ErrorKind::InvalidInput)));
        transport
    }

    #[test]
    fn test_new_serial_transport() {
        let transport = Serial::new("/dev/ttyACM0");
        assert_eq!(transport.get_port(), "/dev/ttyACM0");
        assert_eq!(transport.get_config().baud_rate, 57_600);
        assert_eq!(transport.get_config().timeout, Duration::from_millis(10));
        assert!(transport.io.lock().is_none());
    }

    #[test]
    fn test_serial_config() {
        let config = SerialConfig::new("COM4")
            .with_baud_rate(115_200)
            .with_timeout(Duration::from_millis(50));
        assert_eq!(config.port, "COM4");
        assert_eq!(config.baud_rate, 115_200);
        assert_eq!(config.timeout, Duration::from_millis(50));
        assert_eq!(Serial::with_config(config).get_port(), "COM4");
    }

    #[test]
    fn test_close_serial_transport() {
        let (mut transport, _) = get_test_successful_transport();
        let result = transport.close();
        assert!(result.is_ok());
        assert!(transport.io.lock().is_none());
    }

    #[test]
    fn test_not_opened() {
        let mut transport = Serial::new("/dev/ttyACM0");
        let result = transport.write(&[1, 2, 3]);
        assert_eq!(
            result.unwrap_err().to_string(),
            "Protocol error: Connection has not been initialized."
        );
        let mut buf = [0; 3];
        assert!(transport.read(&mut buf).is_err());
        // The timeout is kept for the next opening.
        assert!(transport.set_timeout(Duration::from_millis(20)).is_ok());
        assert_eq!(transport.get_config().timeout, Duration::from_millis(20));
    }

    #[test]
    fn test_write_data() {
        let (mut transport, port) = get_test_successful_transport();
        let result = transport.write(&[1, 2, 3]);
        assert!(result.is_ok());
        let result = transport.write(&[]);
        assert!(result.is_ok());
        assert_eq!(port.written(), vec![1, 2, 3]);

        let mut transport = get_test_failing_transport();
        let result = transport.write(&[1, 2, 3]);
        assert!(result.is_err());
    }

    #[test]
    fn test_read_data() {
        let (mut transport, port) = get_test_successful_transport();
        let mut buf = [0; 8];

        // Nothing arrived before the timeout.
        let result = transport.read(&mut buf);
        assert_eq!(result.unwrap(), 0);

        port.push_incoming(&[0xF9, 0x02, 0x05]);
        let result = transport.read(&mut buf);
        assert_eq!(result.unwrap(), 3);
        assert_eq!(&buf[..3], &[0xF9, 0x02, 0x05]);

        let mut transport = get_test_failing_transport();
        let result = transport.read(&mut buf);
        assert!(result.is_err());
    }

    #[test]
    fn test_from_serial_error() {
        let serial_error = serialport::Error {
            kind: ErrorKind::Unknown,
            description: String::from("test error"),
        };
        let custom_error: Error = serial_error.into();
        assert_eq!(custom_error.to_string(), "Protocol error: test error.");

        let serial_error = serialport::Error {
            kind: ErrorKind::Io(std::io::ErrorKind::NotFound),
            description: String::from("IO error"),
        };
        let custom_error: Error = serial_error.into();
        assert_eq!(
            custom_error.to_string(),
            "Protocol error: Board not found or already in use."
        );

        let serial_error = serialport::Error {
            kind: ErrorKind::Io(std::io::ErrorKind::Other),
            description: String::from("IO error"),
        };
        let custom_error: Error = serial_error.into();
        assert_eq!(custom_error.to_string(), "Protocol error: IO error.");
    }

    #[test]
    fn test_display_serial_transport() {
        let transport = Serial::new("/dev/ttyACM0");
        assert_eq!(format!("{}", transport), "Serial(/dev/ttyACM0)");
    }
}
