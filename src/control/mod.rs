//! Closed-loop control: per-zone PID with autotune, time-proportional SSR
//! drive, and fan duty policy.

pub mod autotune;
pub mod fan;
pub mod pid;
pub mod ssr;

use serde::{Deserialize, Serialize};

use crate::sensors::ChannelId;

/// Number of independently regulated heating zones.
pub const ZONE_COUNT: usize = 3;

/// Heating zone identity.  Each zone has its own thermocouple channel,
/// PID controller and SSR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Zone {
    /// Top hot-air nozzle.
    Top = 0,
    /// Bottom hot-air heater.
    Bottom = 1,
    /// IR preheat table.
    Ir = 2,
}

impl Zone {
    pub const ALL: [Zone; ZONE_COUNT] = [Zone::Top, Zone::Bottom, Zone::Ir];

    pub const fn index(self) -> usize {
        self as usize
    }

    /// The thermocouple that measures this zone.
    pub const fn channel(self) -> ChannelId {
        match self {
            Zone::Top => ChannelId::Top,
            Zone::Bottom => ChannelId::Bottom,
            Zone::Ir => ChannelId::Ir,
        }
    }
}
