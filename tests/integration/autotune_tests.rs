//! Autotune through the service: bang-bang drive, convergence gains,
//! timeout fallback, abort and over-temperature.

use crate::mock_hw::{MockStation, RecordingSink, VecLog};

use reflowstation::app::events::AppEvent;
use reflowstation::app::service::AppService;
use reflowstation::config::ControllerConfig;
use reflowstation::control::autotune::{AutotuneOutcome, FALLBACK_GAINS};
use reflowstation::control::pid::PidGains;
use reflowstation::control::Zone;
use reflowstation::fsm::RunState;
use reflowstation::sensors::ChannelId;

fn idle_rig() -> (AppService, MockStation, VecLog, RecordingSink) {
    (
        AppService::new(ControllerConfig::default()),
        MockStation::at(25.0),
        VecLog::default(),
        RecordingSink::new(),
    )
}

fn finished_report(sink: &RecordingSink) -> Option<(Zone, AutotuneOutcome, PidGains, u64)> {
    sink.events.iter().find_map(|e| match e {
        AppEvent::AutotuneFinished { zone, report } => {
            Some((*zone, report.outcome, report.gains, report.elapsed_ms))
        }
        _ => None,
    })
}

#[test]
fn converged_autotune_yields_target_derived_gains() {
    let (mut app, mut hw, mut log, mut sink) = idle_rig();
    hw.set(ChannelId::Top, 150.0);
    app.start_autotune(Zone::Top, 200.0, &mut sink).unwrap();
    assert_eq!(app.state(), RunState::Autotuning);

    app.tick(0, &mut hw, &mut log, &mut sink);
    let snap = app.snapshot();
    assert_eq!(snap.outputs(), [50.0, 0.0, 0.0]);
    assert!(snap.autotune);
    assert!(hw.heater_on(Zone::Top));
    assert!(!hw.heater_on(Zone::Bottom));
    assert!(!hw.heater_on(Zone::Ir));

    // Above target: drive drops to zero.
    hw.set(ChannelId::Top, 205.0);
    app.tick(200, &mut hw, &mut log, &mut sink);
    assert_eq!(app.snapshot().out_top, 0.0);

    hw.set(ChannelId::Top, 199.0);
    app.tick(400, &mut hw, &mut log, &mut sink);
    assert_eq!(app.state(), RunState::Idle);

    let (zone, outcome, gains, _) = finished_report(&sink).unwrap();
    assert_eq!(zone, Zone::Top);
    assert_eq!(outcome, AutotuneOutcome::Converged);
    assert_eq!(gains, PidGains::new(12.0, 0.4, 90.0));
    assert_eq!(app.zone_gains(Zone::Top), PidGains::new(12.0, 0.4, 90.0));
    assert!(app.pid(Zone::Top).is_autotuned());
    assert!(sink.contains(&AppEvent::StateChanged {
        from: RunState::Autotuning,
        to: RunState::Idle
    }));

    assert_eq!(log.rows.len(), 2, "the finishing tick is not logged");
    assert!(log.rows.iter().all(|r| r.autotune && r.phase.as_str() == "Autotune"));
}

#[test]
fn autotune_without_convergence_falls_back_at_sixty_seconds() {
    let (mut app, mut hw, mut log, mut sink) = idle_rig();
    app.start_autotune(Zone::Bottom, 200.0, &mut sink).unwrap();

    for t in (0..60_000).step_by(200) {
        app.tick(t, &mut hw, &mut log, &mut sink);
    }
    assert_eq!(app.state(), RunState::Autotuning);
    assert!(finished_report(&sink).is_none());

    app.tick(60_000, &mut hw, &mut log, &mut sink);
    assert_eq!(app.state(), RunState::Idle);
    let (zone, outcome, gains, elapsed) = finished_report(&sink).unwrap();
    assert_eq!(zone, Zone::Bottom);
    assert_eq!(outcome, AutotuneOutcome::TimedOut);
    assert_eq!(gains, PidGains::new(2.0, 0.1, 0.0));
    assert_eq!(gains, FALLBACK_GAINS);
    assert_eq!(elapsed, 60_000);
    assert_eq!(app.zone_gains(Zone::Bottom), FALLBACK_GAINS);
    assert!(!app.pid(Zone::Bottom).is_autotuned());
}

#[test]
fn autotune_timer_starts_at_the_last_tick() {
    let (mut app, mut hw, mut log, mut sink) = idle_rig();
    for t in (0..=1000).step_by(200) {
        app.tick(t, &mut hw, &mut log, &mut sink);
    }
    app.start_autotune(Zone::Ir, 150.0, &mut sink).unwrap();
    for t in (1200..=60_800).step_by(200) {
        app.tick(t, &mut hw, &mut log, &mut sink);
    }
    assert_eq!(app.state(), RunState::Autotuning);
    app.tick(61_000, &mut hw, &mut log, &mut sink);
    assert_eq!(app.state(), RunState::Idle);
}

#[test]
fn abort_cancels_autotune_and_keeps_gains() {
    let (mut app, mut hw, mut log, mut sink) = idle_rig();
    let before = app.zone_gains(Zone::Top);
    app.start_autotune(Zone::Top, 180.0, &mut sink).unwrap();
    app.tick(0, &mut hw, &mut log, &mut sink);
    assert!(hw.heater_on(Zone::Top));

    app.abort(&mut sink);
    assert_eq!(app.state(), RunState::Aborted);
    assert!(!app.pid(Zone::Top).is_autotuning());

    app.tick(200, &mut hw, &mut log, &mut sink);
    assert!(!hw.heater_on(Zone::Top));
    assert_eq!(app.zone_gains(Zone::Top), before);
    assert!(finished_report(&sink).is_none());
}

#[test]
fn over_temperature_during_autotune_aborts() {
    let (mut app, mut hw, mut log, mut sink) = idle_rig();
    app.start_autotune(Zone::Top, 200.0, &mut sink).unwrap();
    app.tick(0, &mut hw, &mut log, &mut sink);

    hw.set(ChannelId::External, 285.0);
    app.tick(200, &mut hw, &mut log, &mut sink);
    assert_eq!(app.state(), RunState::Aborted);
    assert!(Zone::ALL.iter().all(|&z| !hw.heater_on(z)));
}

#[test]
fn autotune_rejected_while_running() {
    let (mut app, _hw, _log, mut sink) = idle_rig();
    app.start(reflowstation::profile::Profile::lead_free_bga(), &mut sink)
        .unwrap();
    assert!(app.start_autotune(Zone::Top, 200.0, &mut sink).is_err());
    assert_eq!(app.state(), RunState::Running);
}
