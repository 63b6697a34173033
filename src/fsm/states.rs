//! Concrete state handler functions and table builder.
//!
//! ```text
//!  IDLE ──[start(profile)]──▶ RUNNING ──[last phase elapsed]──▶ DONE
//!   │  ▲                         │                              │
//!   │  └──[autotune finished]──┐ │ [abort / over-temp]          │
//!   │                          │ ▼                              │
//!   └─[start_autotune]─▶ AUTOTUNING ──[abort / over-temp]──▶ ABORTED
//!
//!  DONE / ABORTED ──[reset]──▶ IDLE
//! ```
//!
//! Commands (`start`, `start_autotune`, `abort`, `reset`) and the safety
//! supervisor drive transitions through `Fsm::force_transition`; the
//! per-tick handlers only advance phases and finish autotune runs.

use log::{info, warn};

use super::context::ControllerContext;
use super::{RunState, StateDescriptor};
use crate::control::autotune::{AutotuneOutcome, AutotuneStep};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once at startup.
pub fn build_state_table() -> [StateDescriptor; RunState::COUNT] {
    [
        StateDescriptor {
            id: RunState::Idle,
            name: "Idle",
            on_enter: Some(idle_enter),
            on_exit: None,
            on_update: idle_update,
        },
        StateDescriptor {
            id: RunState::Running,
            name: "Running",
            on_enter: Some(running_enter),
            on_exit: Some(running_exit),
            on_update: running_update,
        },
        StateDescriptor {
            id: RunState::Autotuning,
            name: "Autotuning",
            on_enter: Some(autotuning_enter),
            on_exit: Some(autotuning_exit),
            on_update: autotuning_update,
        },
        StateDescriptor {
            id: RunState::Done,
            name: "Done",
            on_enter: Some(done_enter),
            on_exit: None,
            on_update: finished_update,
        },
        StateDescriptor {
            id: RunState::Aborted,
            name: "Aborted",
            on_enter: Some(aborted_enter),
            on_exit: None,
            on_update: finished_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE
// ═══════════════════════════════════════════════════════════════════════════

fn idle_enter(ctx: &mut ControllerContext) {
    // Airflow is left alone: a reset straight after a run keeps cooling
    // until cool_down() releases it.
    ctx.commands.heaters_off();
    ctx.profile = None;
    ctx.phase_index = 0;
    ctx.phase_entered = false;
    ctx.over_temp_limit_c = ctx.config.autotune_over_temp_limit_c;
    info!("IDLE: heaters off, waiting for a command");
}

fn idle_update(ctx: &mut ControllerContext) -> Option<RunState> {
    ctx.cool_down();
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  RUNNING: phase sequencing with per-zone PID
// ═══════════════════════════════════════════════════════════════════════════

fn running_enter(ctx: &mut ControllerContext) {
    ctx.process_start_ms = ctx.now_ms;
    if let Some(profile) = ctx.profile.as_ref() {
        info!(
            "RUNNING: profile '{}', {} phases, limit {:.0}\u{00b0}C",
            profile.name,
            profile.phases.len(),
            profile.over_temp_limit_c
        );
    }
    ctx.enter_phase(0);
}

fn running_exit(ctx: &mut ControllerContext) {
    ctx.commands.heaters_off();
}

fn running_update(ctx: &mut ControllerContext) -> Option<RunState> {
    let Some(phase) = ctx.current_phase() else {
        warn!("RUNNING: no phase loaded, aborting");
        return Some(RunState::Aborted);
    };

    if ctx.ms_in_phase() >= phase.duration_ms() {
        let next = ctx.phase_index + 1;
        if next >= ctx.phase_count() {
            info!(
                "RUNNING: last phase complete after {}s",
                ctx.now_ms.saturating_sub(ctx.process_start_ms) / 1000
            );
            return Some(RunState::Done);
        }
        // Integrals start from zero on the entry tick; regulation resumes
        // on the next one.
        ctx.enter_phase(next);
        return None;
    }

    ctx.regulate();
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  AUTOTUNING: one zone, bang-bang drive until converged or timed out
// ═══════════════════════════════════════════════════════════════════════════

fn autotuning_enter(ctx: &mut ControllerContext) {
    let Some(session) = ctx.autotune else {
        return;
    };
    let settings = ctx.autotune_settings();
    for (i, pid) in ctx.pids.iter_mut().enumerate() {
        pid.set_enabled(i == session.zone.index());
        pid.reset();
    }
    ctx.pids[session.zone.index()].start_autotune(session.target_c, ctx.now_ms, settings);
    ctx.commands.heaters_off();
    ctx.commands.cooling = false;
    ctx.fans.idle();
    info!(
        "AUTOTUNING: zone {:?} towards {:.0}\u{00b0}C",
        session.zone, session.target_c
    );
}

fn autotuning_exit(ctx: &mut ControllerContext) {
    if let Some(session) = ctx.autotune.take() {
        ctx.pids[session.zone.index()].cancel_autotune();
    }
    ctx.commands.heaters_off();
}

fn autotuning_update(ctx: &mut ControllerContext) -> Option<RunState> {
    let Some(session) = ctx.autotune else {
        return Some(RunState::Idle);
    };
    let z = session.zone.index();
    let current = ctx.sensors.get(session.zone.channel()).celsius;

    match ctx.pids[z].autotune_step(current, ctx.now_ms) {
        Some(AutotuneStep::Drive(percent)) => {
            ctx.commands.heaters_off();
            ctx.commands.heater_percent[z] = percent;
            None
        }
        Some(AutotuneStep::Finished(report)) => {
            if report.outcome == AutotuneOutcome::TimedOut {
                warn!("AUTOTUNING: zone {:?} timed out, fallback gains", session.zone);
            }
            ctx.autotune_result = Some((session.zone, report));
            Some(RunState::Idle)
        }
        None => Some(RunState::Idle),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  DONE / ABORTED: heaters off, cooling airflow until cold
// ═══════════════════════════════════════════════════════════════════════════

fn start_post_run_cooling(ctx: &mut ControllerContext) {
    ctx.disable_all_zones();
    ctx.commands.heaters_off();
    ctx.commands.cooling = true;
    let rate = ctx.config.post_run_cooling_rate;
    ctx.fans.apply_cooling(rate);
}

fn done_enter(ctx: &mut ControllerContext) {
    start_post_run_cooling(ctx);
    info!("DONE: profile complete, cooling");
}

fn aborted_enter(ctx: &mut ControllerContext) {
    start_post_run_cooling(ctx);
    warn!(
        "ABORTED: heaters disabled, fault_flags=0b{:08b}",
        ctx.fault_flags
    );
}

fn finished_update(ctx: &mut ControllerContext) -> Option<RunState> {
    // Leaving requires an explicit reset.
    ctx.cool_down();
    None
}
