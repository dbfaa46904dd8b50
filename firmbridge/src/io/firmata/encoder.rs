use log::{trace, warn};

use crate::errors::{Error, HardwareError};
use crate::io::firmata::codec;
use crate::io::firmata::constants::*;
use crate::io::{Firmata, PinModeId, IO};
use crate::utils::Scalable;

impl Firmata {
    /// Checks the device advertised `mode` for the `pin`.
    fn require(&self, pin: u8, mode: PinModeId, context: &'static str) -> Result<(), Error> {
        match self.registry.has_capability(pin, mode) {
            true => Ok(()),
            false => {
                warn!("Pin {} does not support {}: {} refused", pin, mode, context);
                Err(HardwareError::CapabilityViolation { pin, mode, context }.into())
            }
        }
    }

    /// Sends `frames` preceded by the mode-set frame when the pin is not in `mode` yet.
    ///
    /// Nothing is sent when the pin already holds `value` in that mode. The pin state is only
    /// updated once the transport accepted the write.
    fn write_pin(
        &mut self,
        pin: u8,
        mode: PinModeId,
        value: u16,
        frames: &[u8],
    ) -> Result<(), Error> {
        let mode_changed = self.state.mode(pin) != Some(mode);
        if !mode_changed && self.state.last_written(pin) == Some((mode, value)) {
            trace!("Pin {} already holds {} ({}): nothing sent", pin, value, mode);
            return Ok(());
        }

        let mut buf = Vec::with_capacity(frames.len() + 3);
        if mode_changed {
            buf.extend(codec::set_pin_mode(pin, mode));
        }
        buf.extend_from_slice(frames);
        self.write(&buf)?;

        self.state.set_mode(pin, mode);
        self.state.record_write(pin, mode, value);
        Ok(())
    }
}

impl IO for Firmata {
    fn is_connected(&self) -> bool {
        self.link_state().is_connected()
    }

    fn set_digital_output(&mut self, pin: u8, level: bool) -> Result<(), Error> {
        self.require(pin, PinModeId::OUTPUT, "set digital output")?;
        let (port, bitmask) = self.state.output_with(pin, level);
        self.write_pin(
            pin,
            PinModeId::OUTPUT,
            u16::from(level),
            &codec::digital_port_write(port, bitmask),
        )?;
        self.state.set_output_level(pin, level);
        Ok(())
    }

    fn set_analog_output(&mut self, pin: u8, percent: f64) -> Result<(), Error> {
        self.require(pin, PinModeId::PWM, "set analog output")?;
        let percent = match percent.is_nan() {
            true => 0.0,
            false => percent.clamp(0.0, 100.0),
        };
        let value = percent.scale(0.0, 100.0, 0.0, 255.0).round() as u16;
        self.write_pin(pin, PinModeId::PWM, value, &codec::analog_write(pin, value))
    }

    fn set_servo_angle(&mut self, pin: u8, degrees: f64) -> Result<(), Error> {
        self.require(pin, PinModeId::SERVO, "set servo angle")?;
        let degrees = match degrees.is_nan() {
            true => 0.0,
            false => degrees.clamp(0.0, 180.0),
        };
        let value = degrees.round() as u16;
        self.write_pin(pin, PinModeId::SERVO, value, &codec::analog_write(pin, value))
    }

    fn read_digital_input(&mut self, pin: u8) -> Result<bool, Error> {
        self.require(pin, PinModeId::INPUT, "read digital input")?;
        if self.state.mode(pin) != Some(PinModeId::INPUT) {
            self.write(&codec::set_pin_mode(pin, PinModeId::INPUT))?;
            self.state.set_mode(pin, PinModeId::INPUT);
        }
        Ok(self.state.digital_level(pin))
    }

    fn read_analog_input(&self, channel: u8) -> Result<u8, Error> {
        match self.registry.channel_pin(channel) {
            Some(_) => Ok(self.state.analog_percent(channel)),
            None => Err(HardwareError::UnknownChannel { channel }.into()),
        }
    }

    fn read_analog_pin(&self, pin: u8) -> Result<u8, Error> {
        let channel = self.registry.pin_channel(pin).ok_or_else(|| {
            Error::from(HardwareError::CapabilityViolation {
                pin,
                mode: PinModeId::ANALOG,
                context: "read analog pin",
            })
        })?;
        self.read_analog_input(channel)
    }

    fn query_capabilities(&mut self) -> Result<(), Error> {
        self.write(&codec::sysex_query(CAPABILITY_QUERY))
    }

    fn query_analog_mapping(&mut self) -> Result<(), Error> {
        self.write(&codec::sysex_query(ANALOG_MAPPING_QUERY))
    }

    fn query_firmware(&mut self) -> Result<(), Error> {
        self.write(&codec::sysex_query(REPORT_FIRMWARE))
    }

    fn report_digital(&mut self, port: u8, state: bool) -> Result<(), Error> {
        if usize::from(port) >= PORT_COUNT {
            return Err(HardwareError::UnknownPort { port }.into());
        }
        self.write(&codec::report_digital(port, state))
    }

    fn report_analog(&mut self, channel: u8, state: bool) -> Result<(), Error> {
        if usize::from(channel) >= PORT_COUNT {
            return Err(HardwareError::UnknownChannel { channel }.into());
        }
        self.write(&codec::report_analog(channel, state))
    }

    fn sampling_interval(&mut self, interval: u16) -> Result<(), Error> {
        self.write(&codec::sampling_interval(interval))
    }

    fn software_reset(&mut self) -> Result<(), Error> {
        self.write(&codec::system_reset())
    }
}

#[cfg(test)]
mod tests {
    use crate::io::{PinMode, PinModeId, IO};
    use crate::mocks::create_connected_session;
    use crate::utils::format_as_hex;

    #[test]
    fn test_set_digital_output() {
        let (mut session, transport) = create_connected_session();

        let result = session.set_digital_output(0, true);
        assert!(result.is_ok(), "{:?}", result);
        let written = transport.take_written();
        assert_eq!(
            written,
            vec![0xF4, 0x00, 0x01, 0x90, 0x01, 0x00],
            "Buffer data has been sent [{}]",
            format_as_hex(&written)
        );

        // Same level: nothing sent.
        assert!(session.set_digital_output(0, true).is_ok());
        assert!(transport.take_written().is_empty());

        // The whole port is written.
        assert!(session.set_digital_output(3, true).is_ok());
        assert_eq!(
            transport.take_written(),
            vec![0xF4, 0x03, 0x01, 0x90, 0x09, 0x00]
        );
        assert!(session.set_digital_output(0, false).is_ok());
        assert_eq!(transport.take_written(), vec![0x90, 0x08, 0x00]);
        assert_eq!(session.pin_state().port_output(0), 0x08);
    }

    #[test]
    fn test_capability_violation() {
        let (mut session, transport) = create_connected_session();

        let result = session.set_digital_output(2, true);
        assert_eq!(
            result.unwrap_err().to_string(),
            "Hardware error: Pin (2) not compatible with mode (OUTPUT) - set digital output."
        );
        assert!(session.set_analog_output(0, 50.0).is_err());
        assert!(session.set_servo_angle(1, 90.0).is_err());
        assert!(session.read_digital_input(1).is_err());
        assert!(session.set_digital_output(42, true).is_err());
        assert!(transport.written().is_empty());
        assert_eq!(session.pin_state().mode(2), None);
    }

    #[test]
    fn test_set_analog_output() {
        let (mut session, transport) = create_connected_session();

        assert!(session.set_analog_output(1, 50.0).is_ok());
        assert_eq!(
            transport.take_written(),
            vec![0xF4, 0x01, 0x03, 0xE1, 0x00, 0x01]
        );
        assert!(session.set_analog_output(1, 50.0).is_ok());
        assert!(transport.take_written().is_empty());

        assert!(session.set_analog_output(1, 100.0).is_ok());
        assert_eq!(transport.take_written(), vec![0xE1, 0x7F, 0x01]);
        // Clamped to 100%: already written.
        assert!(session.set_analog_output(1, 150.0).is_ok());
        assert!(transport.take_written().is_empty());
        assert!(session.set_analog_output(1, -5.0).is_ok());
        assert_eq!(transport.take_written(), vec![0xE1, 0x00, 0x00]);
        assert_eq!(session.pin_state().last_written(1), Some((PinModeId::PWM, 0)));
    }

    #[test]
    fn test_set_servo_angle() {
        let (mut session, transport) = create_connected_session();

        assert!(session.set_servo_angle(3, 90.0).is_ok());
        assert_eq!(
            transport.take_written(),
            vec![0xF4, 0x03, 0x04, 0xE3, 0x5A, 0x00]
        );
        assert!(session.set_servo_angle(3, 200.0).is_ok());
        assert_eq!(transport.take_written(), vec![0xE3, 0x34, 0x01]);

        // Another mode on the same pin: the mode is sent again.
        assert!(session.set_analog_output(3, 50.0).is_ok());
        assert_eq!(
            transport.take_written(),
            vec![0xF4, 0x03, 0x03, 0xE3, 0x00, 0x01]
        );
        assert!(session.set_servo_angle(3, 180.0).is_ok());
        assert_eq!(
            transport.take_written(),
            vec![0xF4, 0x03, 0x04, 0xE3, 0x34, 0x01]
        );
    }

    #[test]
    fn test_extended_analog() {
        let (mut session, transport) = create_connected_session();
        let pwm = vec![PinMode {
            mode: 0x03,
            resolution: 8,
        }];
        session.registry.load_capabilities(&vec![pwm; 20]);

        assert!(session.set_analog_output(18, 100.0).is_ok());
        assert_eq!(
            transport.take_written(),
            vec![0xF4, 0x12, 0x03, 0xF0, 0x6F, 0x12, 0x7F, 0x01, 0xF7]
        );
    }

    #[test]
    fn test_failed_write_is_not_recorded() {
        let (mut session, transport) = create_connected_session();

        transport.set_failing(true);
        assert!(session.set_digital_output(0, true).is_err());
        assert_eq!(session.pin_state().mode(0), None);
        assert_eq!(session.pin_state().port_output(0), 0);

        transport.set_failing(false);
        assert!(session.set_digital_output(0, true).is_ok());
        assert_eq!(
            transport.take_written(),
            vec![0xF4, 0x00, 0x01, 0x90, 0x01, 0x00]
        );
    }

    #[test]
    fn test_read_digital_input() {
        let (mut session, transport) = create_connected_session();

        assert!(!session.read_digital_input(0).unwrap());
        assert_eq!(transport.take_written(), vec![0xF4, 0x00, 0x00]);

        session.receive(&[0x90, 0x01, 0x00]).unwrap();
        assert!(session.read_digital_input(0).unwrap());
        assert!(transport.take_written().is_empty());

        // Back to OUTPUT: the mode is sent again.
        assert!(session.set_digital_output(0, true).is_ok());
        assert_eq!(
            transport.take_written(),
            vec![0xF4, 0x00, 0x01, 0x90, 0x01, 0x00]
        );
    }

    #[test]
    fn test_read_analog() {
        let (mut session, _) = create_connected_session();

        assert_eq!(session.read_analog_input(0).unwrap(), 0);
        session.receive(&[0xE0, 0x7F, 0x07]).unwrap();
        assert_eq!(session.read_analog_input(0).unwrap(), 100);
        session.receive(&[0xE0, 0x00, 0x04]).unwrap();
        assert_eq!(session.read_analog_input(0).unwrap(), 50);
        assert_eq!(session.read_analog_pin(2).unwrap(), 50);

        assert_eq!(
            session.read_analog_input(1).unwrap_err().to_string(),
            "Hardware error: Unknown analog channel 1."
        );
        assert_eq!(
            session.read_analog_pin(0).unwrap_err().to_string(),
            "Hardware error: Pin (0) not compatible with mode (ANALOG) - read analog pin."
        );
    }

    #[test]
    fn test_queries() {
        let (mut session, transport) = create_connected_session();

        assert!(session.query_capabilities().is_ok());
        assert!(session.query_analog_mapping().is_ok());
        assert!(session.query_firmware().is_ok());
        assert_eq!(
            transport.take_written(),
            vec![0xF0, 0x6B, 0xF7, 0xF0, 0x69, 0xF7, 0xF0, 0x79, 0xF7]
        );

        assert!(session.sampling_interval(19).is_ok());
        assert_eq!(transport.take_written(), vec![0xF0, 0x7A, 0x13, 0x00, 0xF7]);
        assert!(session.software_reset().is_ok());
        assert_eq!(transport.take_written(), vec![0xFF]);
    }

    #[test]
    fn test_reporting() {
        let (mut session, transport) = create_connected_session();

        assert!(session.report_digital(1, false).is_ok());
        assert!(session.report_analog(3, true).is_ok());
        assert_eq!(transport.take_written(), vec![0xD1, 0x00, 0xC3, 0x01]);

        assert_eq!(
            session.report_digital(16, true).unwrap_err().to_string(),
            "Hardware error: Unknown digital port 16."
        );
        assert!(session.report_analog(16, true).is_err());
        assert!(transport.written().is_empty());
    }
}
