//! Sensor subsystem: the four thermocouple channels and the aggregating
//! [`SensorHub`].
//!
//! The hub owns every channel's validation state and produces a
//! [`SensorSnapshot`] each tick that gets written into
//! `ControllerContext.sensors`.

pub mod thermocouple;

use serde::{Deserialize, Serialize};

use crate::app::ports::ThermocouplePort;
use crate::config::ControllerConfig;
use thermocouple::{ChannelReading, TemperatureChannel};

/// Number of thermocouple channels.
pub const CHANNEL_COUNT: usize = 4;

/// Thermocouple channel identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ChannelId {
    /// Top hot-air nozzle.
    Top = 0,
    /// Bottom hot-air heater.
    Bottom = 1,
    /// IR preheat table.
    Ir = 2,
    /// External probe on the board under work (monitor only).
    External = 3,
}

impl ChannelId {
    pub const ALL: [ChannelId; CHANNEL_COUNT] = [
        ChannelId::Top,
        ChannelId::Bottom,
        ChannelId::Ir,
        ChannelId::External,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Validated readings of every channel at one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SensorSnapshot {
    pub channels: [ChannelReading; CHANNEL_COUNT],
}

impl SensorSnapshot {
    pub fn get(&self, channel: ChannelId) -> ChannelReading {
        self.channels[channel.index()]
    }

    /// Hottest filtered temperature across all channels (disconnected
    /// channels contribute their frozen value).
    pub fn max_celsius(&self) -> f32 {
        self.channels
            .iter()
            .map(|c| c.celsius)
            .fold(f32::NEG_INFINITY, f32::max)
    }
}

/// Owns the per-channel validators.
pub struct SensorHub {
    channels: [TemperatureChannel; CHANNEL_COUNT],
}

impl SensorHub {
    pub fn new(config: &ControllerConfig) -> Self {
        Self {
            channels: core::array::from_fn(|_| TemperatureChannel::new(config)),
        }
    }

    /// Read and validate every channel.
    ///
    /// Reader errors never propagate: they count as implausible samples
    /// and the channel holds its previous good value.
    pub fn read_all(&mut self, reader: &mut impl ThermocouplePort, now_ms: u64) -> SensorSnapshot {
        let mut snap = SensorSnapshot::default();
        for id in ChannelId::ALL {
            let raw = reader.read(id);
            snap.channels[id.index()] = self.channels[id.index()].validate(raw, now_ms);
        }
        snap
    }

    /// Latest filtered state without sampling.
    pub fn snapshot(&self) -> SensorSnapshot {
        SensorSnapshot {
            channels: core::array::from_fn(|i| self.channels[i].reading()),
        }
    }

    pub fn channel(&self, id: ChannelId) -> &TemperatureChannel {
        &self.channels[id.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ThermocoupleError;

    struct FixedReader([Result<f32, ThermocoupleError>; CHANNEL_COUNT]);

    impl ThermocouplePort for FixedReader {
        fn read(&mut self, channel: ChannelId) -> Result<f32, ThermocoupleError> {
            self.0[channel.index()]
        }
    }

    #[test]
    fn reads_every_channel() {
        let mut hub = SensorHub::new(&ControllerConfig::default());
        let mut reader = FixedReader([Ok(100.0), Ok(110.0), Ok(90.0), Ok(30.0)]);
        let snap = hub.read_all(&mut reader, 0);
        assert_eq!(snap.get(ChannelId::Bottom).celsius, 110.0);
        assert_eq!(snap.max_celsius(), 110.0);
        assert_eq!(hub.snapshot(), snap);
    }

    #[test]
    fn faulted_channel_keeps_frozen_value_in_max() {
        let mut hub = SensorHub::new(&ControllerConfig::default());
        let mut reader = FixedReader([Ok(260.0), Ok(110.0), Ok(90.0), Ok(30.0)]);
        hub.read_all(&mut reader, 0);
        reader.0[0] = Err(ThermocoupleError::OpenCircuit);
        let mut snap = SensorSnapshot::default();
        for t in 1..=6 {
            snap = hub.read_all(&mut reader, t * 200);
        }
        assert!(!snap.get(ChannelId::Top).connected);
        assert_eq!(snap.max_celsius(), 260.0);
        assert!(hub.channel(ChannelId::Bottom).is_connected());
    }
}
