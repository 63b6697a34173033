//! Autotune sub-state machine embedded in each [`PidController`].
//!
//! ```text
//!  Inactive ──start()──▶ Sampling ──|target - T| < band──▶ Inactive (converged)
//!                           │
//!                           └──elapsed ≥ timeout──▶ Inactive (fallback gains)
//! ```
//!
//! While sampling the zone is driven two-level: `drive_percent` below the
//! target, 0 % at or above it.  Up to [`MAX_SAMPLES`] readings are kept for
//! the report.
//!
//! The gain heuristic is not a relay-feedback Ziegler–Nichols procedure.
//! It derives the gains from the target magnitude alone and is kept exactly
//! as the station has always computed them.
//!
//! [`PidController`]: super::pid::PidController

use heapless::Vec;
use log::{info, warn};

use super::pid::PidGains;
use crate::config::ControllerConfig;

/// Maximum number of temperature samples recorded per run.
pub const MAX_SAMPLES: usize = 100;

/// Gains installed when the zone never reaches the band in time.
pub const FALLBACK_GAINS: PidGains = PidGains::new(2.0, 0.1, 0.0);

/// Timing and drive parameters for a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutotuneSettings {
    pub timeout_ms: u32,
    pub band_c: f32,
    pub drive_percent: f32,
}

impl From<&ControllerConfig> for AutotuneSettings {
    fn from(config: &ControllerConfig) -> Self {
        Self {
            timeout_ms: config.autotune_timeout_ms,
            band_c: config.autotune_band_c,
            drive_percent: config.autotune_drive_percent,
        }
    }
}

impl Default for AutotuneSettings {
    fn default() -> Self {
        Self::from(&ControllerConfig::default())
    }
}

/// How an autotune run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutotuneOutcome {
    /// Reached the band; gains computed from the target.
    Converged,
    /// Timed out; fallback gains applied.
    TimedOut,
}

/// Summary handed back when a run ends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutotuneReport {
    pub outcome: AutotuneOutcome,
    pub target: f32,
    pub gains: PidGains,
    pub samples: usize,
    pub elapsed_ms: u64,
}

/// Result of one autotune sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AutotuneStep {
    /// Still sampling; drive the heater at this percentage.
    Drive(f32),
    /// Run ended; the controller has already installed `report.gains`.
    Finished(AutotuneReport),
}

/// Gains derived from the autotune target.
///
/// `Kp = 0.6·target/10`, `Ki = 2·Kp/60`, `Kd = Kp·60/8`, evaluated in `f64`
/// so round targets land on exact gains.
pub fn gains_for_target(target: f32) -> PidGains {
    let target = f64::from(target);
    let kp = 0.6 * target / 10.0;
    let ki = 2.0 * kp / 60.0;
    let kd = kp * 60.0 / 8.0;
    PidGains::new(kp as f32, ki as f32, kd as f32)
}

#[derive(Debug, Clone, Default)]
enum AutotuneState {
    #[default]
    Inactive,
    Sampling {
        target: f32,
        started_ms: u64,
        settings: AutotuneSettings,
        samples: Vec<f32, MAX_SAMPLES>,
    },
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Autotune {
    state: AutotuneState,
    autotuned: bool,
}

impl Autotune {
    pub(crate) fn start(&mut self, target: f32, now_ms: u64, settings: AutotuneSettings) {
        info!("AUTOTUNE: start, target {:.1}\u{00b0}C", target);
        self.autotuned = false;
        self.state = AutotuneState::Sampling {
            target,
            started_ms: now_ms,
            settings,
            samples: Vec::new(),
        };
    }

    pub(crate) fn cancel(&mut self) {
        if self.is_active() {
            info!("AUTOTUNE: cancelled");
        }
        self.state = AutotuneState::Inactive;
    }

    pub(crate) fn is_active(&self) -> bool {
        matches!(self.state, AutotuneState::Sampling { .. })
    }

    pub(crate) fn is_autotuned(&self) -> bool {
        self.autotuned
    }

    pub(crate) fn step(&mut self, current: f32, now_ms: u64) -> Option<AutotuneStep> {
        let AutotuneState::Sampling {
            target,
            started_ms,
            settings,
            samples,
        } = &mut self.state
        else {
            return None;
        };

        let target = *target;
        let elapsed_ms = now_ms.saturating_sub(*started_ms);

        if elapsed_ms >= u64::from(settings.timeout_ms) {
            warn!(
                "AUTOTUNE: no convergence within {}s, applying fallback gains",
                settings.timeout_ms / 1000
            );
            let report = AutotuneReport {
                outcome: AutotuneOutcome::TimedOut,
                target,
                gains: FALLBACK_GAINS,
                samples: samples.len(),
                elapsed_ms,
            };
            self.state = AutotuneState::Inactive;
            return Some(AutotuneStep::Finished(report));
        }

        // Full buffer just stops recording; the run carries on.
        let _ = samples.push(current);

        if (target - current).abs() < settings.band_c {
            let gains = gains_for_target(target);
            info!(
                "AUTOTUNE: converged after {}ms, Kp={:.3} Ki={:.3} Kd={:.3}",
                elapsed_ms, gains.kp, gains.ki, gains.kd
            );
            let report = AutotuneReport {
                outcome: AutotuneOutcome::Converged,
                target,
                gains,
                samples: samples.len(),
                elapsed_ms,
            };
            self.state = AutotuneState::Inactive;
            self.autotuned = true;
            return Some(AutotuneStep::Finished(report));
        }

        let drive = if current < target {
            settings.drive_percent
        } else {
            0.0
        };
        Some(AutotuneStep::Drive(drive))
    }
}
