//! Heating-zone fan duty policy.
//!
//! Two independent duties (top and bottom hot-air fans).  There is no
//! "off" state for these fans: air keeps moving across the heaters at a
//! low idle duty even when nothing is running.
//!
//! After a run the cooling tier is applied identically to both fans.
//! Cool phases are different: each fan keeps its own phase duty as a
//! floor and is only raised to the tier, so a phase asking for 80/30 at
//! a 3 °C/s rate runs at 80/60.

use serde::{Deserialize, Serialize};

/// Top / bottom fan duty in percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FanSpeeds {
    pub top: u8,
    pub bottom: u8,
}

impl FanSpeeds {
    pub const fn both(duty: u8) -> Self {
        Self {
            top: duty,
            bottom: duty,
        }
    }
}

/// Fan identity for the [`FanPort`](crate::app::ports::FanPort).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanId {
    Top,
    Bottom,
}

/// Map a cooling-rate intent (°C/s) to a discrete duty tier.
pub fn cooling_tier(rate: f32) -> u8 {
    if rate <= 1.5 {
        20
    } else if rate <= 2.5 {
        40
    } else {
        60
    }
}

pub struct FanSpeedController {
    idle_duty: u8,
    duty: FanSpeeds,
}

impl FanSpeedController {
    pub fn new(idle_duty: u8) -> Self {
        let idle_duty = idle_duty.clamp(1, 100);
        Self {
            idle_duty,
            duty: FanSpeeds::both(idle_duty),
        }
    }

    /// Current commanded duty.
    pub fn duty(&self) -> FanSpeeds {
        self.duty
    }

    /// Back to the idle airflow.
    pub fn idle(&mut self) {
        self.duty = FanSpeeds::both(self.idle_duty);
    }

    /// Duty straight from a heating phase.  A zero request falls back to
    /// idle airflow.
    pub fn set_phase(&mut self, speeds: FanSpeeds) {
        self.duty = FanSpeeds {
            top: self.floor(speeds.top),
            bottom: self.floor(speeds.bottom),
        };
    }

    /// Cooling policy: same tier on both fans.
    pub fn apply_cooling(&mut self, rate: f32) {
        self.duty = FanSpeeds::both(cooling_tier(rate));
    }

    /// Cooling phase: per fan, the larger of the phase's own duty and the
    /// cooling tier for its rate.  Asymmetric phase duties survive.
    pub fn set_cooling_phase(&mut self, speeds: FanSpeeds, rate: f32) {
        let tier = cooling_tier(rate);
        self.duty = FanSpeeds {
            top: self.floor(speeds.top).max(tier),
            bottom: self.floor(speeds.bottom).max(tier),
        };
    }

    fn floor(&self, duty: u8) -> u8 {
        if duty == 0 {
            self.idle_duty
        } else {
            duty.min(100)
        }
    }
}
