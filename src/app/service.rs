//! Application service: the hexagonal core.
//!
//! [`AppService`] owns the FSM, the controller context, the sensor hub,
//! the safety supervisor and the SSR actuator.  All I/O flows through
//! port traits injected at call sites, so the whole service runs against
//! mock adapters in tests and a plant model in the simulator.
//!
//! ```text
//!  ThermocouplePort ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!                       │          AppService          │
//!  HeaterPort ◀──────── │ Sensors · Safety · FSM · PID │ ──▶ ProcessLog
//!  FanPort    ◀──────── │            · SSR             │
//!                       └──────────────────────────────┘
//! ```
//!
//! One tick: validate 4 readings → safety check → phase advance →
//! per-zone PID → SSR on/off → fan duty → log row.

use heapless::String;
use log::{error, info, warn};

use crate::config::ControllerConfig;
use crate::control::fan::FanId;
use crate::control::pid::{PidController, PidGains};
use crate::control::ssr::SsrActuator;
use crate::control::{Zone, ZONE_COUNT};
use crate::error::{CommandError, Result};
use crate::fsm::context::{AutotuneSession, ControllerContext};
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, RunState};
use crate::profile::{bounded, Profile, PHASE_NAME_LEN};
use crate::safety::SafetySupervisor;
use crate::sensors::{ChannelId, SensorHub, SensorSnapshot};

use super::commands::AppCommand;
use super::events::{AppEvent, LogRow};
use super::ports::{EventSink, FanPort, HeaterPort, ProcessLog, ThermocouplePort};
use super::snapshot::Snapshot;

const AUTOTUNE_LABEL: &str = "Autotune";

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all control logic.
pub struct AppService {
    fsm: Fsm,
    ctx: ControllerContext,
    safety: SafetySupervisor,
    sensors: SensorHub,
    ssr: SsrActuator,
    /// SSR levels written on the last tick.
    heaters: [bool; ZONE_COUNT],
    last_tick_ms: Option<u64>,
    tick_count: u64,
}

impl AppService {
    /// Construct the service from configuration, in `Idle` with every
    /// heater off.
    pub fn new(config: ControllerConfig) -> Self {
        let sensors = SensorHub::new(&config);
        let ssr = SsrActuator::new(config.ssr_window_ms);
        let mut ctx = ControllerContext::new(config);
        let mut fsm = Fsm::new(build_state_table(), RunState::Idle);
        fsm.start(&mut ctx);

        Self {
            fsm,
            ctx,
            safety: SafetySupervisor::new(),
            sensors,
            ssr,
            heaters: [false; ZONE_COUNT],
            last_tick_ms: None,
            tick_count: 0,
        }
    }

    /// Report the initial state to `sink`.
    pub fn announce(&self, sink: &mut impl EventSink) {
        sink.emit(&AppEvent::Started(self.state()));
        info!("AppService started in {:?}", self.state());
    }

    // ── Commands ──────────────────────────────────────────────

    /// Begin running `profile` from its first phase.
    ///
    /// Rejected with `InvalidCommand` unless Idle, and with
    /// `InvalidProfile` if the profile fails validation.  A rejected start
    /// leaves every piece of state untouched.
    pub fn start(&mut self, profile: Profile, sink: &mut impl EventSink) -> Result<()> {
        let state = self.state();
        if state != RunState::Idle {
            warn!("start rejected: controller is {:?}", state);
            return Err(CommandError::NotIdle(state).into());
        }
        if let Err(e) = profile.validate() {
            warn!("start rejected: {}", e);
            return Err(e.into());
        }

        let name = profile.name.clone();
        let phases = profile.phases.len();
        self.ctx.now_ms = self.anchor_ms();
        self.ctx.load_profile(profile);
        sink.emit(&AppEvent::RunStarted {
            profile: name,
            phases,
        });
        self.force(RunState::Running, sink);
        self.report_phase(sink);
        Ok(())
    }

    /// Autotune one zone.  Only accepted from Idle; the controller
    /// returns to Idle when the run finishes.
    pub fn start_autotune(
        &mut self,
        zone: Zone,
        target_c: f32,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        let state = self.state();
        if state != RunState::Idle {
            warn!("autotune rejected: controller is {:?}", state);
            return Err(CommandError::NotIdle(state).into());
        }
        let cfg = &self.ctx.config;
        if !(target_c.is_finite()
            && target_c > cfg.plausible_min_c
            && target_c < cfg.autotune_over_temp_limit_c)
        {
            warn!("autotune rejected: target {target_c}\u{00b0}C");
            return Err(CommandError::BadAutotuneTarget.into());
        }

        self.ctx.now_ms = self.anchor_ms();
        self.ctx.autotune = Some(AutotuneSession { zone, target_c });
        self.force(RunState::Autotuning, sink);
        Ok(())
    }

    /// Stop a run or autotune.  No-op when nothing is running.
    ///
    /// The transition is immediate; heater writes follow on the next tick.
    pub fn abort(&mut self, sink: &mut impl EventSink) {
        let state = self.state();
        if state.is_active() {
            warn!("abort requested while {:?}", state);
            self.force(RunState::Aborted, sink);
        } else {
            info!("abort ignored: controller is {:?}", state);
        }
    }

    /// Acknowledge a finished or aborted run.  Idle is a no-op.
    pub fn reset(&mut self, sink: &mut impl EventSink) -> Result<()> {
        let state = self.state();
        if state.is_finished() {
            self.force(RunState::Idle, sink);
            Ok(())
        } else if state.is_active() {
            warn!("reset rejected: controller is {:?}", state);
            Err(CommandError::RunInProgress(state).into())
        } else {
            Ok(())
        }
    }

    /// Dispatch an external command.
    pub fn handle_command(&mut self, cmd: AppCommand, sink: &mut impl EventSink) -> Result<()> {
        match cmd {
            AppCommand::Start(profile) => self.start(profile, sink),
            AppCommand::Abort => {
                self.abort(sink);
                Ok(())
            }
            AppCommand::Reset => self.reset(sink),
            AppCommand::StartAutotune { zone, target_c } => {
                self.start_autotune(zone, target_c, sink)
            }
        }
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one full control cycle at `now_ms`.
    ///
    /// `hw` provides every hardware port at once, which avoids a double
    /// mutable borrow while keeping the port boundary explicit.
    pub fn tick(
        &mut self,
        now_ms: u64,
        hw: &mut (impl ThermocouplePort + HeaterPort + FanPort),
        log: &mut impl ProcessLog,
        sink: &mut impl EventSink,
    ) {
        self.tick_count += 1;
        self.ctx.dt_secs = match self.last_tick_ms {
            Some(prev) if now_ms > prev => (now_ms - prev) as f32 / 1000.0,
            _ => self.ctx.config.sample_period_secs(),
        };
        self.last_tick_ms = Some(now_ms);
        self.ctx.now_ms = now_ms;
        let prev_state = self.state();

        // 1. Validate raw readings
        let before = self.ctx.sensors;
        let snap = self.sensors.read_all(hw, now_ms);
        self.ctx.sensors = snap;
        Self::report_channels(&before, &snap, sink);

        // 2. Safety
        let prev_faults = self.ctx.fault_flags;
        let faults = self
            .safety
            .evaluate(&snap, self.ctx.over_temp_limit_c, prev_state.is_active());
        self.ctx.fault_flags = faults;
        Self::report_faults(prev_faults, faults, sink);

        if self.safety.tripped() {
            error!(
                "SAFETY: over-temperature while {:?}, aborting",
                prev_state
            );
            self.force(RunState::Aborted, sink);
            self.apply_outputs(hw);
            return;
        }

        // 3. Phase advance and regulation
        self.fsm.tick(&mut self.ctx);
        let state = self.state();
        if state != prev_state {
            sink.emit(&AppEvent::StateChanged {
                from: prev_state,
                to: state,
            });
        }

        // 4. SSR and fans
        self.apply_outputs(hw);

        // 5. Process log
        if state.is_active() {
            log.append_row(&self.log_row());
        }

        // 6. Events
        self.report_phase(sink);
        if let Some((zone, report)) = self.ctx.autotune_result.take() {
            sink.emit(&AppEvent::AutotuneFinished { zone, report });
        }
    }

    // ── Queries ───────────────────────────────────────────────

    /// Tick-boundary status snapshot.
    pub fn snapshot(&self) -> Snapshot {
        let s = &self.ctx.sensors;
        let out = self.ctx.commands.heater_percent;
        let fans = self.ctx.fans.duty();
        let state = self.state();

        let (phase, phase_index, remain) = match state {
            RunState::Running => (
                self.phase_label(),
                u8::try_from(self.ctx.phase_index).ok(),
                self.ctx.remaining_secs(),
            ),
            RunState::Autotuning => (self.phase_label(), None, 0),
            _ => (String::new(), None, 0),
        };

        Snapshot {
            state,
            phase,
            phase_index,
            remain,
            top: s.get(ChannelId::Top).celsius,
            bottom: s.get(ChannelId::Bottom).celsius,
            ir: s.get(ChannelId::Ir).celsius,
            external: s.get(ChannelId::External).celsius,
            connected: s.channels.map(|c| c.connected),
            out_top: out[Zone::Top.index()],
            out_bottom: out[Zone::Bottom.index()],
            out_ir: out[Zone::Ir.index()],
            heaters: self.heaters,
            fan_top: fans.top,
            fan_bottom: fans.bottom,
            cooling: self.ctx.commands.cooling,
            autotune: state == RunState::Autotuning,
            faults: self.ctx.fault_flags,
        }
    }

    /// Current run state.
    pub fn state(&self) -> RunState {
        self.fsm.current_state()
    }

    /// Index of the running phase, if a profile is running.
    pub fn phase_index(&self) -> Option<usize> {
        (self.state() == RunState::Running).then_some(self.ctx.phase_index)
    }

    /// Live gains of a zone (e.g. after an autotune).
    pub fn zone_gains(&self, zone: Zone) -> PidGains {
        self.ctx.pids[zone.index()].gains()
    }

    pub fn pid(&self, zone: Zone) -> &PidController {
        &self.ctx.pids[zone.index()]
    }

    /// Latest validated readings.
    pub fn sensors(&self) -> &SensorSnapshot {
        &self.ctx.sensors
    }

    /// SSR levels written on the last tick.
    pub fn heater_levels(&self) -> [bool; ZONE_COUNT] {
        self.heaters
    }

    /// Profile of the current or last run.
    pub fn profile(&self) -> Option<&Profile> {
        self.ctx.profile.as_ref()
    }

    /// Current active fault bitmask (0 = no faults).
    pub fn fault_flags(&self) -> u8 {
        self.ctx.fault_flags
    }

    /// Total control ticks executed since construction.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.ctx.config
    }

    // ── Internal ──────────────────────────────────────────────

    /// Time base for commands issued between ticks.
    fn anchor_ms(&self) -> u64 {
        self.last_tick_ms.unwrap_or(0)
    }

    fn force(&mut self, to: RunState, sink: &mut impl EventSink) {
        let from = self.state();
        self.fsm.force_transition(to, &mut self.ctx);
        if from != to {
            sink.emit(&AppEvent::StateChanged { from, to });
        }
    }

    fn phase_label(&self) -> String<PHASE_NAME_LEN> {
        if self.state() == RunState::Autotuning {
            return bounded(AUTOTUNE_LABEL);
        }
        self.ctx
            .current_phase()
            .map(|p| p.name.clone())
            .unwrap_or_default()
    }

    /// Translate commands into port calls: one heater write per zone,
    /// both fans, the cooling output.
    fn apply_outputs(&mut self, hw: &mut (impl HeaterPort + FanPort)) {
        self.heaters = if self.state().is_active() {
            self.ssr
                .drive(&self.ctx.commands.heater_percent, self.ctx.now_ms)
        } else {
            [false; ZONE_COUNT]
        };
        for zone in Zone::ALL {
            hw.set_heater(zone, self.heaters[zone.index()]);
        }

        let duty = self.ctx.fans.duty();
        hw.set_fan(FanId::Top, duty.top);
        hw.set_fan(FanId::Bottom, duty.bottom);
        hw.set_cooling(self.ctx.commands.cooling);
    }

    fn log_row(&self) -> LogRow {
        LogRow {
            timestamp_ms: self.ctx.now_ms,
            phase: self.phase_label(),
            temps: self.ctx.sensors.channels.map(|c| c.celsius),
            outputs: self.ctx.commands.heater_percent,
            autotune: self.state() == RunState::Autotuning,
        }
    }

    fn report_phase(&mut self, sink: &mut impl EventSink) {
        if !self.ctx.phase_entered {
            return;
        }
        self.ctx.phase_entered = false;
        if let Some(phase) = self.ctx.current_phase() {
            sink.emit(&AppEvent::PhaseStarted {
                index: self.ctx.phase_index,
                name: phase.name.clone(),
                kind: phase.kind,
                target_c: phase.target_c,
            });
        }
    }

    fn report_channels(before: &SensorSnapshot, after: &SensorSnapshot, sink: &mut impl EventSink) {
        for id in ChannelId::ALL {
            match (before.get(id).connected, after.get(id).connected) {
                (true, false) => sink.emit(&AppEvent::ThermocoupleFault(id)),
                (false, true) => sink.emit(&AppEvent::ThermocoupleRestored(id)),
                _ => {}
            }
        }
    }

    fn report_faults(prev: u8, now: u8, sink: &mut impl EventSink) {
        if now & !prev != 0 {
            sink.emit(&AppEvent::FaultDetected(now));
        } else if prev != 0 && now == 0 {
            sink.emit(&AppEvent::FaultCleared);
        }
    }
}
