//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the `log` facade.  Whatever backend the binary installs (console,
//! `tracing-subscriber`, UART logger) decides where they end up.

use log::{error, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::control::autotune::AutotuneOutcome;

/// Adapter that logs every [`AppEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Telemetry(s) => {
                info!(
                    "TELEM | {:?} {} {}s | T={:.1}/{:.1}/{:.1}/{:.1}\u{00b0}C | \
                     out={:.0}/{:.0}/{:.0}% | fans={}/{}% cool={} | faults=0b{:08b}",
                    s.state,
                    s.phase,
                    s.remain,
                    s.top,
                    s.bottom,
                    s.ir,
                    s.external,
                    s.out_top,
                    s.out_bottom,
                    s.out_ir,
                    s.fan_top,
                    s.fan_bottom,
                    s.cooling,
                    s.faults,
                );
            }
            AppEvent::StateChanged { from, to } => {
                info!("STATE | {:?} -> {:?}", from, to);
            }
            AppEvent::RunStarted { profile, phases } => {
                info!("RUN   | '{}' with {} phases", profile, phases);
            }
            AppEvent::PhaseStarted {
                index,
                name,
                kind,
                target_c,
            } => {
                info!(
                    "PHASE | #{} {} ({:?}) -> {:.0}\u{00b0}C",
                    index, name, kind, target_c
                );
            }
            AppEvent::FaultDetected(flags) => {
                error!("FAULT | detected, flags=0b{:08b}", flags);
            }
            AppEvent::FaultCleared => {
                info!("FAULT | all cleared");
            }
            AppEvent::ThermocoupleFault(ch) => {
                warn!("TC    | {:?} disconnected, holding last value", ch);
            }
            AppEvent::ThermocoupleRestored(ch) => {
                info!("TC    | {:?} restored", ch);
            }
            AppEvent::AutotuneFinished { zone, report } => {
                let g = report.gains;
                match report.outcome {
                    AutotuneOutcome::Converged => info!(
                        "TUNE  | {:?} converged in {}ms: Kp={:.3} Ki={:.3} Kd={:.3}",
                        zone, report.elapsed_ms, g.kp, g.ki, g.kd
                    ),
                    AutotuneOutcome::TimedOut => warn!(
                        "TUNE  | {:?} timed out, fallback Kp={:.3} Ki={:.3} Kd={:.3}",
                        zone, g.kp, g.ki, g.kd
                    ),
                }
            }
            AppEvent::Started(state) => {
                info!("START | initial_state={:?}", state);
            }
        }
    }
}
