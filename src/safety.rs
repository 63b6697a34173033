//! Safety supervisor.
//!
//! The supervisor runs **every tick before the FSM** and keeps a fault
//! bitmask in `ControllerContext.fault_flags`.
//!
//! ## Fault classes
//!
//! - `OverTemperature` is fatal: while a run or autotune is armed, the
//!   hottest filtered channel at or above the limit forces `Aborted`,
//!   zeroes every heater for the tick and skips the rest of the tick.
//!   Once disarmed (Idle, Done, Aborted) the bit follows the temperature
//!   again so it clears as the station cools.
//! - The per-channel thermocouple bits are advisory.  A disconnected
//!   channel holds its last good value and the run continues; the bit is
//!   only surfaced in the snapshot and event stream.
//!
//! Multiple faults may be active at once.

use log::{error, info, warn};

use crate::error::SafetyFault;
use crate::sensors::{ChannelId, SensorSnapshot};

/// Safety supervisor.
#[derive(Debug, Default)]
pub struct SafetySupervisor {
    faults: u8,
    tripped: bool,
}

impl SafetySupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate every condition against the latest filtered readings.
    ///
    /// `armed` is true while Running or Autotuning.  Returns the updated
    /// fault bitmask; [`tripped`](Self::tripped) tells whether this
    /// evaluation demands an abort.
    pub fn evaluate(&mut self, snap: &SensorSnapshot, over_temp_limit_c: f32, armed: bool) -> u8 {
        // ── Thermocouples (advisory) ─────────────────────────────
        for id in ChannelId::ALL {
            self.eval_advisory(SafetyFault::thermocouple(id), !snap.get(id).connected);
        }

        // ── Over-temperature ─────────────────────────────────────
        let max_c = snap.max_celsius();
        let over = max_c >= over_temp_limit_c;
        self.tripped = armed && over;
        if self.tripped {
            error!(
                "SAFETY FAULT SET: {} ({:.1}\u{00b0}C >= {:.1}\u{00b0}C)",
                SafetyFault::OverTemperature,
                max_c,
                over_temp_limit_c
            );
            self.faults |= SafetyFault::OverTemperature.mask();
        } else {
            self.eval_fault(SafetyFault::OverTemperature, over);
        }

        self.faults
    }

    /// True when the last evaluation demands an abort.
    pub fn tripped(&self) -> bool {
        self.tripped
    }

    /// Current fault bitmask.
    pub fn faults(&self) -> u8 {
        self.faults
    }

    /// True if **any** fault is active.
    pub fn has_faults(&self) -> bool {
        self.faults != 0
    }

    /// Check if a specific fault is active.
    pub fn has_fault(&self, fault: SafetyFault) -> bool {
        self.faults & fault.mask() != 0
    }

    // ── Internal ──────────────────────────────────────────────────

    fn eval_fault(&mut self, fault: SafetyFault, condition: bool) {
        if condition {
            if self.faults & fault.mask() == 0 {
                error!("SAFETY FAULT SET: {fault}");
            }
            self.faults |= fault.mask();
        } else {
            if self.faults & fault.mask() != 0 {
                info!("SAFETY FAULT CLEARED: {fault}");
            }
            self.faults &= !fault.mask();
        }
    }

    fn eval_advisory(&mut self, fault: SafetyFault, condition: bool) {
        if condition {
            if self.faults & fault.mask() == 0 {
                warn!("SAFETY: {fault}, holding last valid reading");
            }
            self.faults |= fault.mask();
        } else {
            if self.faults & fault.mask() != 0 {
                info!("SAFETY: {fault} cleared");
            }
            self.faults &= !fault.mask();
        }
    }
}
