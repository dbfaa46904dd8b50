use std::fmt::{Display, Formatter};

/// Connection status, as displayed by the host next to the board blocks.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connected,
}

impl ConnectionStatus {
    /// Numeric status code understood by the host: 1 when disconnected, 2 when connected.
    pub fn code(&self) -> u8 {
        match self {
            ConnectionStatus::Disconnected => 1,
            ConnectionStatus::Connected => 2,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConnectionStatus::Disconnected => "Disconnected",
            ConnectionStatus::Connected => "Connected",
        }
    }
}

impl From<bool> for ConnectionStatus {
    fn from(connected: bool) -> Self {
        match connected {
            true => ConnectionStatus::Connected,
            false => ConnectionStatus::Disconnected,
        }
    }
}

impl Display for ConnectionStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Comparison operators of the analog threshold block.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Above,
    Below,
    Equal,
}

impl Comparison {
    /// Applies the comparison: `value <op> threshold`.
    pub fn compare(&self, value: f64, threshold: f64) -> bool {
        match self {
            Comparison::Above => value > threshold,
            Comparison::Below => value < threshold,
            Comparison::Equal => value == threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::hardware::{Comparison, ConnectionStatus};

    #[test]
    fn test_connection_status() {
        assert_eq!(ConnectionStatus::default(), ConnectionStatus::Disconnected);
        assert_eq!(ConnectionStatus::Disconnected.code(), 1);
        assert_eq!(ConnectionStatus::Connected.code(), 2);
        assert_eq!(ConnectionStatus::from(true), ConnectionStatus::Connected);
        assert_eq!(format!("{}", ConnectionStatus::from(false)), "Disconnected");
        assert_eq!(ConnectionStatus::Connected.label(), "Connected");
    }

    #[test]
    fn test_comparison() {
        assert!(Comparison::Above.compare(51.0, 50.0));
        assert!(!Comparison::Above.compare(50.0, 50.0));
        assert!(Comparison::Below.compare(49.0, 50.0));
        assert!(!Comparison::Below.compare(50.0, 50.0));
        assert!(Comparison::Equal.compare(50.0, 50.0));
        assert!(!Comparison::Equal.compare(50.5, 50.0));
    }
}
