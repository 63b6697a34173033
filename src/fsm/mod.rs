//! Function-pointer finite state machine engine for the process scheduler.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  StateTable                                                  │
//! │  ┌────────────┬───────────┬──────────┬───────────────────┐   │
//! │  │ RunState   │ on_enter  │ on_exit  │ on_update         │   │
//! │  ├────────────┼───────────┼──────────┼───────────────────┤   │
//! │  │ Idle       │ fn(ctx)   │ -        │ fn(ctx)->Option<> │   │
//! │  │ Running    │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option<> │   │
//! │  │ Autotuning │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option<> │   │
//! │  │ Done       │ fn(ctx)   │ -        │ fn(ctx)->Option<> │   │
//! │  │ Aborted    │ fn(ctx)   │ -        │ fn(ctx)->Option<> │   │
//! │  └────────────┴───────────┴──────────┴───────────────────┘   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! `on_update` of the active row runs once per control tick.  A returned
//! state triggers exit of the old row and entry of the new one.  Handlers
//! share a single `&mut ControllerContext`, the only home of run and PID
//! state; commands and the safety trip go through `force_transition`.

pub mod context;
pub mod states;

use context::ControllerContext;
use log::info;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Process run state.  Discriminants index the table from
/// [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum RunState {
    Idle = 0,
    Running = 1,
    Autotuning = 2,
    Done = 3,
    Aborted = 4,
}

impl RunState {
    pub const COUNT: usize = 5;

    /// Inverse of `as usize`.  Out-of-range maps to `Aborted` (debug
    /// builds assert).
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Idle,
            1 => Self::Running,
            2 => Self::Autotuning,
            3 => Self::Done,
            4 => Self::Aborted,
            _ => {
                debug_assert!(false, "run state index {idx} out of range");
                Self::Aborted
            }
        }
    }

    /// Heaters may be energised in this state.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Running | Self::Autotuning)
    }

    /// A run or autotune has ended and awaits `reset`.
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Done | Self::Aborted)
    }
}

// ---------------------------------------------------------------------------
// Table rows
// ---------------------------------------------------------------------------

/// Entry or exit hook, run once per transition.
pub type StateActionFn = fn(&mut ControllerContext);

/// Per-tick handler; `Some(next)` leaves the state.
pub type StateUpdateFn = fn(&mut ControllerContext) -> Option<RunState>;

pub struct StateDescriptor {
    pub id: RunState,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

pub struct Fsm {
    /// Indexed by `RunState as usize`.
    table: [StateDescriptor; RunState::COUNT],
    current: usize,
    tick_count: u64,
    state_entry_tick: u64,
}

impl Fsm {
    pub fn new(table: [StateDescriptor; RunState::COUNT], initial: RunState) -> Self {
        Self {
            table,
            current: initial as usize,
            tick_count: 0,
            state_entry_tick: 0,
        }
    }

    /// Enter the initial state.  Once, before the first tick.
    pub fn start(&mut self, ctx: &mut ControllerContext) {
        info!("FSM: initial state {}", self.table[self.current].name);
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// One update of the active state, then its transition if any.
    pub fn tick(&mut self, ctx: &mut ControllerContext) {
        self.tick_count += 1;
        if let Some(next) = (self.table[self.current].on_update)(ctx) {
            self.transition(next, ctx);
        }
    }

    /// Force an immediate transition (commands and the safety supervisor).
    pub fn force_transition(&mut self, next: RunState, ctx: &mut ControllerContext) {
        if next as usize != self.current {
            self.transition(next, ctx);
        }
    }

    pub fn current_state(&self) -> RunState {
        RunState::from_index(self.current)
    }

    /// Human-readable name of the current state.
    pub fn current_name(&self) -> &'static str {
        self.table[self.current].name
    }

    pub fn ticks_in_current_state(&self) -> u64 {
        self.tick_count - self.state_entry_tick
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, next: RunState, ctx: &mut ControllerContext) {
        let from = &self.table[self.current];
        info!("FSM: {} -> {}", from.name, self.table[next as usize].name);
        if let Some(exit) = from.on_exit {
            exit(ctx);
        }

        self.current = next as usize;
        self.state_entry_tick = self.tick_count;

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::context::ControllerContext;
    use super::*;
    use crate::config::ControllerConfig;
    use crate::profile::{Phase, Profile};
    use crate::sensors::thermocouple::ChannelReading;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn phase_index_stays_in_range_while_running(
            durations in proptest::collection::vec(1u32..20, 1..10),
            temps in proptest::collection::vec(5.0f32..270.0, 1..400),
        ) {
            let mut profile = Profile::new("prop", 280.0);
            for d in &durations {
                profile.push_phase(Phase::heat("p", 200.0, *d)).unwrap();
            }
            let count = profile.phases.len();

            let mut ctx = ControllerContext::new(ControllerConfig::default());
            let mut fsm = Fsm::new(states::build_state_table(), RunState::Idle);
            fsm.start(&mut ctx);
            ctx.load_profile(profile);
            fsm.force_transition(RunState::Running, &mut ctx);

            let mut now = 0;
            for t in temps {
                now += 200;
                ctx.now_ms = now;
                ctx.sensors.channels = [ChannelReading { celsius: t, connected: true }; 4];
                fsm.tick(&mut ctx);
                let state = fsm.current_state();
                prop_assert!(state == RunState::Running || state == RunState::Done);
                if state == RunState::Running {
                    prop_assert!(ctx.phase_index < count);
                }
                for pid in &ctx.pids {
                    prop_assert!((0.0..=100.0).contains(&pid.integral()));
                }
            }
        }
    }
}
