use std::collections::HashMap;

use log::debug;

use crate::errors::{Error, HardwareError};
use crate::io::data::parse_board_name;
use crate::io::{CapabilityRegistry, PinIdOrName, MAX_PIN};

/// Logical names given to pins ('led', 'pot', ...).
///
/// Aliases are user configuration: they outlive the connection and are validated on registration
/// against the capabilities known at that time.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PinAliases {
    aliases: HashMap<String, u8>,
}

impl PinAliases {
    /// Registers (or replaces) an alias.
    ///
    /// # Errors
    /// * `InvalidAlias`: the name is empty or shadows a board pin name ('D2', 'A0'), the pin is out
    ///   of range, or the connected device does not know the pin.
    pub fn register<S: Into<String>>(
        &mut self,
        name: S,
        pin: u8,
        registry: &CapabilityRegistry,
    ) -> Result<(), Error> {
        let name = name.into();
        let invalid = |info: String| {
            Error::from(HardwareError::InvalidAlias {
                name: name.clone(),
                info,
            })
        };

        if name.trim().is_empty() {
            return Err(invalid(String::from("name cannot be empty")));
        }
        if parse_board_name(&name).is_some() {
            return Err(invalid(String::from("name shadows a board pin name")));
        }
        if pin > MAX_PIN {
            return Err(invalid(format!("pin {} is out of range", pin)));
        }
        if registry.is_populated() && registry.modes(pin).map_or(true, |modes| modes.is_empty()) {
            return Err(invalid(format!("pin {} is not supported by the device", pin)));
        }

        debug!("Alias '{}' registered for pin {}", name, pin);
        self.aliases.insert(name, pin);
        Ok(())
    }

    pub fn unregister(&mut self, name: &str) -> Option<u8> {
        self.aliases.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<u8> {
        self.aliases.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    /// Resolves a pin id, alias, or board name ('D13', or 'A0' through the analog mapping) into a
    /// pin id.
    ///
    /// # Errors
    /// * `UnknownPin`: nothing matches.
    pub fn resolve(&self, pin: &PinIdOrName, registry: &CapabilityRegistry) -> Result<u8, Error> {
        let resolved = match pin {
            PinIdOrName::Id(id) => Some(*id).filter(|id| *id <= MAX_PIN),
            PinIdOrName::Name(name) => match self.get(name) {
                Some(id) => Some(id),
                None => match parse_board_name(name) {
                    Some(('D', id)) => Some(id).filter(|id| *id <= MAX_PIN),
                    Some((_, channel)) => registry.channel_pin(channel),
                    None => None,
                },
            },
        };
        resolved.ok_or_else(|| Error::from(HardwareError::UnknownPin { pin: pin.clone() }))
    }
}
