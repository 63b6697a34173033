//! Shared mutable context threaded through every FSM handler.
//!
//! `ControllerContext` is the single struct that state handlers read from
//! and write to: the latest validated readings, the loaded profile and
//! phase timing, the three zone PID controllers, heater/fan commands and
//! the safety fault mask.  Nothing in the control path lives in a static.

use log::info;

use crate::config::ControllerConfig;
use crate::control::autotune::{AutotuneReport, AutotuneSettings};
use crate::control::fan::FanSpeedController;
use crate::control::pid::{PidController, PidGains};
use crate::control::{Zone, ZONE_COUNT};
use crate::profile::{Phase, Profile};
use crate::sensors::SensorSnapshot;

// ---------------------------------------------------------------------------
// Heater commands (written by state handlers; applied by the service)
// ---------------------------------------------------------------------------

/// Per-tick output requests.  Fan duty lives in [`FanSpeedController`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HeaterCommands {
    /// PID output per zone (0 – 100 %), turned into SSR on/off downstream.
    pub heater_percent: [f32; ZONE_COUNT],
    /// Cooling airflow output.
    pub cooling: bool,
}

impl HeaterCommands {
    pub fn heaters_off(&mut self) {
        self.heater_percent = [0.0; ZONE_COUNT];
    }
}

/// Zone and target of the autotune being run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutotuneSession {
    pub zone: Zone,
    pub target_c: f32,
}

// ---------------------------------------------------------------------------
// ControllerContext
// ---------------------------------------------------------------------------

pub struct ControllerContext {
    // -- Timing --
    /// Timestamp of the current tick (ms, monotonic).
    pub now_ms: u64,
    /// Seconds since the previous tick.
    pub dt_secs: f32,

    // -- Inputs --
    pub sensors: SensorSnapshot,

    // -- Process --
    /// Private copy of the profile being run.
    pub profile: Option<Profile>,
    pub phase_index: usize,
    pub phase_start_ms: u64,
    pub process_start_ms: u64,
    /// Set on phase entry, cleared by whoever reports it.
    pub phase_entered: bool,
    /// Limit enforced by the safety supervisor while armed.
    pub over_temp_limit_c: f32,

    // -- Regulation --
    pub pids: [PidController; ZONE_COUNT],
    pub autotune: Option<AutotuneSession>,
    /// Result of the last finished autotune, until collected.
    pub autotune_result: Option<(Zone, AutotuneReport)>,

    // -- Outputs --
    pub commands: HeaterCommands,
    pub fans: FanSpeedController,

    // -- Configuration / safety --
    pub config: ControllerConfig,
    /// Fault bitmask (see `SafetyFault::mask()`), set by the supervisor.
    pub fault_flags: u8,
}

impl ControllerContext {
    pub fn new(config: ControllerConfig) -> Self {
        Self {
            now_ms: 0,
            dt_secs: config.sample_period_secs(),
            sensors: SensorSnapshot::default(),
            profile: None,
            phase_index: 0,
            phase_start_ms: 0,
            process_start_ms: 0,
            phase_entered: false,
            over_temp_limit_c: config.autotune_over_temp_limit_c,
            pids: core::array::from_fn(|_| PidController::new(PidGains::default())),
            autotune: None,
            autotune_result: None,
            commands: HeaterCommands::default(),
            fans: FanSpeedController::new(config.idle_fan_duty),
            config,
            fault_flags: 0,
        }
    }

    /// Install a validated profile for the next run.
    pub fn load_profile(&mut self, profile: Profile) {
        self.over_temp_limit_c = profile.over_temp_limit_c;
        self.profile = Some(profile);
        self.phase_index = 0;
    }

    pub fn current_phase(&self) -> Option<&Phase> {
        self.profile.as_ref()?.phases.get(self.phase_index)
    }

    pub fn phase_count(&self) -> usize {
        self.profile.as_ref().map_or(0, |p| p.phases.len())
    }

    pub fn ms_in_phase(&self) -> u64 {
        self.now_ms.saturating_sub(self.phase_start_ms)
    }

    /// Whole seconds left in the current phase, rounded up.
    pub fn remaining_secs(&self) -> u32 {
        let Some(phase) = self.current_phase() else {
            return 0;
        };
        let left = phase.duration_ms().saturating_sub(self.ms_in_phase());
        u32::try_from(left.div_ceil(1000)).unwrap_or(u32::MAX)
    }

    /// Enter phase `index`: copy gains and zone enables, reset every
    /// integral, set fan policy, and force heaters off for Cool phases.
    pub fn enter_phase(&mut self, index: usize) {
        let Some(phase) = self.profile.as_ref().and_then(|p| p.phases.get(index)) else {
            return;
        };

        let gains = phase.gains();
        for zone in Zone::ALL {
            let pid = &mut self.pids[zone.index()];
            pid.set_gains(gains);
            pid.set_enabled(!phase.is_cool() && phase.zones.get(zone));
            pid.reset();
        }

        if phase.is_cool() {
            self.fans.set_cooling_phase(phase.fans, phase.cooling_rate);
            self.commands.cooling = true;
        } else {
            self.fans.set_phase(phase.fans);
            self.commands.cooling = false;
        }
        self.commands.heaters_off();

        info!(
            "PHASE {}: {} -> {:.0}\u{00b0}C for {}s",
            index, phase.name, phase.target_c, phase.duration_secs
        );

        self.phase_index = index;
        self.phase_start_ms = self.now_ms;
        self.phase_entered = true;
    }

    /// One PID step per zone towards the current phase target.
    pub fn regulate(&mut self) {
        let Some(phase) = self.profile.as_ref().and_then(|p| p.phases.get(self.phase_index))
        else {
            self.commands.heaters_off();
            return;
        };
        if phase.is_cool() {
            self.commands.heaters_off();
            return;
        }
        for zone in Zone::ALL {
            let current = self.sensors.get(zone.channel()).celsius;
            self.commands.heater_percent[zone.index()] =
                self.pids[zone.index()].step(phase.target_c, current, self.dt_secs);
        }
    }

    /// Disable and clear every zone controller.
    pub fn disable_all_zones(&mut self) {
        for pid in &mut self.pids {
            pid.cancel_autotune();
            pid.set_enabled(false);
            pid.reset();
        }
    }

    /// Post-run airflow: keep cooling until every channel is below the
    /// cool-down threshold, then fall back to idle airflow.
    pub fn cool_down(&mut self) {
        if !self.commands.cooling {
            return;
        }
        let threshold = self.config.cooldown_complete_c;
        if self.sensors.max_celsius() < threshold {
            info!("COOL-DOWN: all channels below {threshold:.0}\u{00b0}C, airflow to idle");
            self.commands.cooling = false;
            self.fans.idle();
        }
    }

    pub fn autotune_settings(&self) -> AutotuneSettings {
        AutotuneSettings::from(&self.config)
    }

    /// Check whether a specific fault flag is set.
    pub fn has_fault(&self, fault: crate::error::SafetyFault) -> bool {
        self.fault_flags & fault.mask() != 0
    }
}
