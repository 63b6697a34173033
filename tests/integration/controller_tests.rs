//! Integration tests for the AppService → sensors → safety → FSM → SSR
//! pipeline, driven through the mock station.

use crate::mock_hw::{MockStation, PortCall, RecordingSink, VecLog};

use reflowstation::app::events::AppEvent;
use reflowstation::app::service::AppService;
use reflowstation::config::ControllerConfig;
use reflowstation::control::fan::FanId;
use reflowstation::control::Zone;
use reflowstation::error::{CommandError, Error, ProfileError, SafetyFault, ThermocoupleError};
use reflowstation::fsm::RunState;
use reflowstation::profile::{Phase, PhaseKind, Profile};
use reflowstation::sensors::ChannelId;

const TICK_MS: u64 = 200;

struct Rig {
    app: AppService,
    hw: MockStation,
    log: VecLog,
    sink: RecordingSink,
}

impl Rig {
    fn new() -> Self {
        Self {
            app: AppService::new(ControllerConfig::default()),
            hw: MockStation::at(25.0),
            log: VecLog::default(),
            sink: RecordingSink::new(),
        }
    }

    fn start(&mut self, profile: Profile) {
        self.app.start(profile, &mut self.sink).unwrap();
    }

    fn tick(&mut self, now_ms: u64) {
        self.app
            .tick(now_ms, &mut self.hw, &mut self.log, &mut self.sink);
    }

    /// Tick every 200 ms over `[from, to]`.
    fn run(&mut self, from: u64, to: u64) {
        let mut t = from;
        while t <= to {
            self.tick(t);
            t += TICK_MS;
        }
    }
}

/// Phase durations 90 / 60 / 30 / 90 s.
fn four_phase_profile() -> Profile {
    Profile::new("Four phase", 280.0)
        .with_phase(Phase::heat("Preheat", 150.0, 90))
        .and_then(|p| p.with_phase(Phase::heat("Soak", 180.0, 60)))
        .and_then(|p| p.with_phase(Phase::heat("Reflow", 230.0, 30)))
        .and_then(|p| p.with_phase(Phase::cool("Cool", 100.0, 90, 3.0)))
        .unwrap()
}

fn short_profile() -> Profile {
    Profile::new("Short", 280.0)
        .with_phase(Phase::heat("Heat", 150.0, 1))
        .and_then(|p| p.with_phase(Phase::cool("Cool", 60.0, 1, 3.0)))
        .unwrap()
}

// ── Commands ──────────────────────────────────────────────────

#[test]
fn empty_profile_is_rejected_and_state_unchanged() {
    let mut rig = Rig::new();
    let err = rig
        .app
        .start(Profile::new("Nothing", 280.0), &mut rig.sink)
        .unwrap_err();
    assert_eq!(err, Error::InvalidProfile(ProfileError::NoPhases));
    assert_eq!(rig.app.state(), RunState::Idle);
    assert!(rig.sink.events.is_empty());

    rig.run(0, 1000);
    assert_eq!(rig.app.state(), RunState::Idle);
    assert!(rig.log.rows.is_empty());
}

#[test]
fn start_while_running_is_invalid_command() {
    let mut rig = Rig::new();
    rig.start(four_phase_profile());
    rig.run(0, 1000);
    let err = rig
        .app
        .start(Profile::lead_free_bga(), &mut rig.sink)
        .unwrap_err();
    assert_eq!(
        err,
        Error::InvalidCommand(CommandError::NotIdle(RunState::Running))
    );
    assert_eq!(rig.app.profile().unwrap().name.as_str(), "Four phase");
}

#[test]
fn start_announces_run_and_first_phase() {
    let mut rig = Rig::new();
    rig.start(four_phase_profile());
    let events = &rig.sink.events;
    assert!(matches!(
        &events[0],
        AppEvent::RunStarted { profile, phases: 4 } if profile.as_str() == "Four phase"
    ));
    assert_eq!(
        events[1],
        AppEvent::StateChanged {
            from: RunState::Idle,
            to: RunState::Running
        }
    );
    assert!(matches!(
        &events[2],
        AppEvent::PhaseStarted { index: 0, name, kind: PhaseKind::Heat, target_c }
            if name.as_str() == "Preheat" && *target_c == 150.0
    ));
}

// ── Phase sequencing ──────────────────────────────────────────

#[test]
fn phase_advances_exactly_at_duration_with_integrals_cleared() {
    let mut rig = Rig::new();
    rig.start(four_phase_profile());

    rig.run(0, 89_800);
    rig.tick(89_900);
    assert_eq!(rig.app.phase_index(), Some(0));
    assert!(rig.app.pid(Zone::Top).integral() > 0.0);

    rig.tick(90_000);
    assert_eq!(rig.app.phase_index(), Some(1));
    for zone in Zone::ALL {
        assert_eq!(rig.app.pid(zone).integral(), 0.0, "{zone:?}");
    }
    assert_eq!(rig.app.snapshot().phase.as_str(), "Soak");
    assert_eq!(rig.app.snapshot().remain, 60);
}

#[test]
fn full_profile_walks_every_phase_then_done() {
    let mut rig = Rig::new();
    rig.start(four_phase_profile());

    rig.run(0, 149_800);
    assert_eq!(rig.app.phase_index(), Some(1));
    rig.tick(150_000);
    assert_eq!(rig.app.phase_index(), Some(2));
    rig.run(150_200, 180_000);
    assert_eq!(rig.app.phase_index(), Some(3));
    rig.run(180_200, 269_800);
    assert_eq!(rig.app.state(), RunState::Running);
    rig.tick(270_000);
    assert_eq!(rig.app.state(), RunState::Done);
    assert_eq!(rig.app.phase_index(), None);

    let phases: Vec<usize> = rig
        .sink
        .events
        .iter()
        .filter_map(|e| match e {
            AppEvent::PhaseStarted { index, .. } => Some(*index),
            _ => None,
        })
        .collect();
    assert_eq!(phases, vec![0, 1, 2, 3]);
    assert!(rig.sink.contains(&AppEvent::StateChanged {
        from: RunState::Running,
        to: RunState::Done
    }));
}

#[test]
fn cool_phase_forces_heaters_off_and_cooling_on() {
    let mut rig = Rig::new();
    rig.start(short_profile());
    rig.run(0, 800);
    assert!(!rig.hw.cooling_on());

    rig.hw.clear_calls();
    rig.tick(1000);
    assert_eq!(rig.app.phase_index(), Some(1));
    assert!(rig.hw.heater_calls().iter().all(|&(_, on)| !on));
    assert!(rig.hw.cooling_on());
    // Rate 3.0 °C/s → 60 % tier, above the idle duty of the phase fans.
    assert_eq!(rig.hw.fan_duty(FanId::Top), Some(60));
    assert_eq!(rig.hw.fan_duty(FanId::Bottom), Some(60));

    rig.hw.clear_calls();
    rig.tick(1200);
    assert!(rig.hw.heater_calls().iter().all(|&(_, on)| !on));
    assert_eq!(rig.app.snapshot().outputs(), [0.0; 3]);
}

#[test]
fn done_keeps_cooling_until_every_channel_is_cold() {
    let mut rig = Rig::new();
    rig.hw.set_all(120.0);
    rig.start(short_profile());
    rig.run(0, 2000);
    assert_eq!(rig.app.state(), RunState::Done);
    assert!(rig.hw.cooling_on());
    // Post-run rate 2.0 °C/s → 40 % tier.
    assert_eq!(rig.hw.fan_duty(FanId::Top), Some(40));

    rig.run(2200, 4000);
    assert!(rig.hw.cooling_on(), "still hot");
    assert!(rig.hw.heater_calls().iter().skip(3 * 10).all(|&(_, on)| !on));

    rig.hw.set_all(45.0);
    rig.tick(4200);
    assert!(!rig.hw.cooling_on());
    assert_eq!(rig.hw.fan_duty(FanId::Top), Some(20));
    assert_eq!(rig.hw.fan_duty(FanId::Bottom), Some(20));
    assert_eq!(rig.app.state(), RunState::Done);

    rig.app.reset(&mut rig.sink).unwrap();
    assert_eq!(rig.app.state(), RunState::Idle);
}

// ── Safety ────────────────────────────────────────────────────

#[test]
fn over_temperature_aborts_on_the_next_tick() {
    let mut rig = Rig::new();
    rig.start(Profile::lead_free_bga());
    rig.run(0, 1000);
    assert!(rig.app.heater_levels().iter().any(|&on| on));
    let rows_before = rig.log.rows.len();

    rig.hw.set(ChannelId::Ir, 280.0);
    rig.hw.clear_calls();
    rig.tick(1200);

    assert_eq!(rig.app.state(), RunState::Aborted);
    assert_eq!(
        rig.hw.heater_calls(),
        vec![(Zone::Top, false), (Zone::Bottom, false), (Zone::Ir, false)]
    );
    assert_eq!(rig.app.snapshot().outputs(), [0.0; 3]);
    assert_eq!(rig.log.rows.len(), rows_before, "no row on the trip tick");
    assert!(rig.sink.contains(&AppEvent::StateChanged {
        from: RunState::Running,
        to: RunState::Aborted
    }));
    assert_eq!(
        rig.sink.count(|e| matches!(
            e,
            AppEvent::FaultDetected(mask) if mask & SafetyFault::OverTemperature.mask() != 0
        )),
        1
    );
    assert!(rig.hw.cooling_on());

    rig.hw.clear_calls();
    rig.tick(1400);
    assert_eq!(rig.app.state(), RunState::Aborted);
    assert!(rig.hw.heater_calls().iter().all(|&(_, on)| !on));
}

#[test]
fn over_temperature_while_idle_only_flags() {
    let mut rig = Rig::new();
    rig.hw.set(ChannelId::External, 300.0);
    rig.run(0, 600);
    assert_eq!(rig.app.state(), RunState::Idle);
    assert_ne!(
        rig.app.fault_flags() & SafetyFault::OverTemperature.mask(),
        0
    );

    rig.hw.set(ChannelId::External, 40.0);
    rig.tick(800);
    assert_eq!(rig.app.fault_flags(), 0);
    assert!(rig.sink.contains(&AppEvent::FaultCleared));
}

#[test]
fn disconnected_channel_does_not_stop_the_run() {
    let mut rig = Rig::new();
    rig.start(four_phase_profile());
    rig.run(0, 1000);

    rig.hw.fail(ChannelId::Bottom, ThermocoupleError::OpenCircuit);
    rig.run(1200, 2000);
    assert!(rig.app.sensors().get(ChannelId::Bottom).connected, "five faults");
    rig.tick(2200);
    let reading = rig.app.sensors().get(ChannelId::Bottom);
    assert!(!reading.connected);
    assert_eq!(reading.celsius, 25.0);
    assert_eq!(rig.app.state(), RunState::Running);
    assert_eq!(
        rig.sink
            .count(|e| *e == AppEvent::ThermocoupleFault(ChannelId::Bottom)),
        1
    );
    assert_ne!(
        rig.app.fault_flags() & SafetyFault::ThermocoupleBottom.mask(),
        0
    );
    assert!(!rig.app.snapshot().connected[ChannelId::Bottom.index()]);

    rig.hw.set(ChannelId::Bottom, 26.0);
    rig.tick(2400);
    assert!(rig.app.sensors().get(ChannelId::Bottom).connected);
    assert!(rig
        .sink
        .contains(&AppEvent::ThermocoupleRestored(ChannelId::Bottom)));
}

// ── Abort ─────────────────────────────────────────────────────

#[test]
fn abort_stops_heating_at_the_next_tick() {
    let mut rig = Rig::new();
    rig.start(Profile::lead_free_bga());
    rig.run(0, 400);

    rig.app.abort(&mut rig.sink);
    assert_eq!(rig.app.state(), RunState::Aborted);

    rig.hw.clear_calls();
    rig.tick(600);
    assert!(rig.hw.heater_calls().iter().all(|&(_, on)| !on));
    assert!(rig.hw.cooling_on());

    let before = rig.sink.events.len();
    rig.app.abort(&mut rig.sink);
    assert_eq!(rig.sink.events.len(), before, "second abort is a no-op");
}

// ── Port traffic ──────────────────────────────────────────────

#[test]
fn every_tick_writes_each_output_once() {
    let mut rig = Rig::new();
    rig.start(Profile::lead_free_bga());
    rig.run(0, 800);

    assert_eq!(rig.hw.heater_calls().len(), 5 * 3);
    let fans = rig
        .hw
        .calls
        .iter()
        .filter(|c| matches!(c, PortCall::Fan { .. }))
        .count();
    let cooling = rig
        .hw
        .calls
        .iter()
        .filter(|c| matches!(c, PortCall::Cooling(_)))
        .count();
    assert_eq!(fans, 5 * 2);
    assert_eq!(cooling, 5);
    assert_eq!(rig.hw.fan_duty(FanId::Top), Some(40));
}

#[test]
fn heater_writes_match_snapshot() {
    let mut rig = Rig::new();
    rig.start(Profile::lead_free_bga());
    for t in (0..=3000).step_by(200) {
        rig.hw.clear_calls();
        rig.tick(t);
        let snap = rig.app.snapshot();
        for zone in Zone::ALL {
            assert_eq!(rig.hw.heater_on(zone), snap.heaters[zone.index()]);
        }
    }
}

// ── Process log ───────────────────────────────────────────────

#[test]
fn one_log_row_per_running_tick() {
    let mut rig = Rig::new();
    rig.run(0, 400);
    assert!(rig.log.rows.is_empty(), "idle ticks are not logged");

    rig.hw.set(ChannelId::External, 30.0);
    rig.start(short_profile());
    rig.run(600, 2600);

    // Anchored at the last idle tick (400): Heat 400..1400, Cool
    // 1400..2400, Done from 2400.
    assert_eq!(rig.app.state(), RunState::Done);
    assert_eq!(rig.log.rows.len(), 9);
    let first = &rig.log.rows[0];
    assert_eq!(first.timestamp_ms, 600);
    assert_eq!(first.phase.as_str(), "Heat");
    assert_eq!(first.temps, [25.0, 25.0, 25.0, 30.0]);
    assert!(!first.autotune);
    assert!(first.outputs.iter().all(|&p| p > 0.0));
    assert_eq!(rig.log.rows[4].timestamp_ms, 1400);
    assert_eq!(rig.log.rows[4].phase.as_str(), "Cool");
    assert_eq!(rig.log.rows[4].outputs, [0.0; 3]);
}

#[test]
fn snapshot_contract_keys() {
    let mut rig = Rig::new();
    rig.start(four_phase_profile());
    rig.tick(0);
    let json = rig.app.snapshot().to_json().unwrap();
    for key in [
        "\"state\":\"RUNNING\"",
        "\"phase\":\"Preheat\"",
        "\"phaseIndex\":0",
        "\"remain\":90",
        "\"outIR\":",
        "\"fanBottom\":20",
        "\"connected\":[true,true,true,true]",
        "\"autotune\":false",
    ] {
        assert!(json.contains(key), "{key} missing from {json}");
    }
}
