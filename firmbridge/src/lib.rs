#![doc(html_root_url = "https://docs.rs/firmbridge/0.1.0")]

//! <h1 align="center">FIRMBRIDGE - Firmata protocol engine</h1>
//! <div style="text-align:center;font-style:italic;">Firmbridge bridges block-programming hosts to Arduino (or compatible) boards running a Firmata sketch.</div>
//!
//! # Features
//!
//! **Firmbridge** speaks the subset of the [Firmata protocol](https://github.com/firmata/protocol)
//! needed to drive digital, analog (PWM) and servo pins:
//!
//! - Decode the device byte stream, whatever its chunking, with a [`StreamParser`](io::StreamParser)
//! - Learn the device pins through the capability handshake ([`CapabilityRegistry`](io::CapabilityRegistry))
//! - Keep the last sampled inputs and commanded outputs in a [`PinStateStore`](io::PinStateStore)
//! - Send validated commands through the [`IO`](io::IO) operations of a [`Firmata`](io::Firmata) session
//! - Keep the connection alive (and notice when it is not) with a [`Board`](hardware::Board)
//!
//! # Prerequisites
//!
//! - [StandardFirmata.ino](https://github.com/firmata/arduino/blob/main/examples/StandardFirmata/StandardFirmata.ino) Arduino sketch **MUST** be installed on the board.
//!   _This code is available by default in Arduino IDE under the Firmata samples sketch menu._
//!
//! # Getting Started
//!
//! The following code blinks the Arduino embedded led on pin 13.
//! ```no_run
//! use firmbridge::hardware::Board;
//! use firmbridge::pause;
//!
//! #[tokio::main]
//! async fn main() {
//!     // Auto-detected serial port.
//!     let board = Board::default();
//!     board.register_alias("led", 13).unwrap();
//!     board.open().unwrap();
//!
//!     // Wait for the handshake.
//!     let mut link = board.subscribe();
//!     while !link.borrow_and_update().is_connected() {
//!         link.changed().await.unwrap();
//!     }
//!
//!     // Blinks the LED every 500ms.
//!     let mut level = true;
//!     while board.is_connected() {
//!         board.set_digital_output("led", level).unwrap();
//!         level = !level;
//!         pause!(500);
//!     }
//! }
//! ```
//!
//! # Feature flags
//!
//! - **libudev** -- (enabled by default) Activates `serialport` crate _libudev_ feature under-the-hood (required on Linux only for port listing).
//! - **serde** -- Enables serialize/deserialize capabilities for configurations and plain data types.
//! - **mocks** -- Provides a mocked transport and serial port (useful for tests mostly).

pub mod errors;
pub mod hardware;
pub mod io;
#[cfg(any(test, feature = "mocks"))]
pub mod mocks;
pub mod utils;
