//! Test doubles standing for a board: a scripted [`MockTransport`](transport::MockTransport), a
//! [`SerialPortMock`](serial_port::SerialPortMock) for the serial transport and a few canned device
//! answers.

use crate::io::{Firmata, IO};
use crate::mocks::transport::MockTransport;

pub mod serial_port;
pub mod transport;

/// Firmware report of an "AB" firmware, version 2.5.
pub const FIRMWARE_REPORT: [u8; 9] = [0xF0, 0x79, 0x02, 0x05, 0x41, 0x00, 0x42, 0x00, 0xF7];

/// Capability report of a 4 pins device:
/// - pin 0: INPUT, OUTPUT
/// - pin 1: OUTPUT, PWM
/// - pin 2: ANALOG
/// - pin 3: SERVO, PWM, OUTPUT
pub const CAPABILITY_REPORT: [u8; 23] = [
    0xF0, 0x6C, // capability response
    0x00, 0x01, 0x01, 0x01, 0x7F, // pin 0
    0x01, 0x01, 0x03, 0x08, 0x7F, // pin 1
    0x02, 0x0A, 0x7F, // pin 2
    0x04, 0x0E, 0x03, 0x08, 0x01, 0x01, 0x7F, // pin 3
    0xF7,
];

/// Analog mapping report: pin 2 is analog channel 0.
pub const ANALOG_MAPPING_REPORT: [u8; 7] = [0xF0, 0x6A, 0x7F, 0x7F, 0x00, 0x7F, 0xF7];

/// Returns a mock transport answering the handshake queries the way the device described by the
/// canned reports above would.
pub fn create_answering_transport() -> MockTransport {
    MockTransport::default()
        .reply_to(&[0xF0, 0x79, 0xF7], &FIRMWARE_REPORT)
        .reply_to(&[0xF0, 0x6B, 0xF7], &CAPABILITY_REPORT)
        .reply_to(&[0xF0, 0x69, 0xF7], &ANALOG_MAPPING_REPORT)
}

/// Returns a session that went through the whole handshake, with its transport: the bytes written
/// during the handshake are already consumed.
pub fn create_connected_session() -> (Firmata, MockTransport) {
    let transport = MockTransport::default();
    let mut session = Firmata::from(transport.clone());

    let handshake = session
        .open()
        .and_then(|_| session.receive(&FIRMWARE_REPORT))
        .and_then(|_| session.receive(&CAPABILITY_REPORT))
        .and_then(|_| session.receive(&ANALOG_MAPPING_REPORT));
    debug_assert!(handshake.is_ok(), "{:?}", handshake);
    debug_assert!(session.is_connected(), "Handshake completed");

    transport.take_written();
    (session, transport)
}
