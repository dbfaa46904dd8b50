use std::time::Duration;

use crate::io::DEFAULT_MAX_MISSED_HEARTBEATS;

/// Timings of a [`Board`](crate::hardware::Board) connection.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    /// Delay before the handshake query is sent again to a silent device.
    pub probe_interval: Duration,
    /// Period of the liveness check once connected.
    pub heartbeat_interval: Duration,
    /// Heartbeats a device may leave unanswered before the connection is dropped.
    pub max_missed_heartbeats: u8,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            probe_interval: Duration::from_millis(1000),
            heartbeat_interval: Duration::from_millis(100),
            max_missed_heartbeats: DEFAULT_MAX_MISSED_HEARTBEATS,
        }
    }
}

impl SessionConfig {
    pub fn with_probe_interval(mut self, interval: Duration) -> Self {
        self.probe_interval = interval;
        self
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    pub fn with_max_missed_heartbeats(mut self, max: u8) -> Self {
        self.max_missed_heartbeats = max;
        self
    }
}
