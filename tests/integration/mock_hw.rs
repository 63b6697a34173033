//! Mock station adapters for integration tests.
//!
//! Records every port call so tests can assert on the full command
//! history without touching real SPI/GPIO/PWM peripherals.

use reflowstation::app::events::{AppEvent, LogRow};
use reflowstation::app::ports::{EventSink, FanPort, HeaterPort, ProcessLog, ThermocouplePort};
use reflowstation::control::fan::FanId;
use reflowstation::control::Zone;
use reflowstation::error::ThermocoupleError;
use reflowstation::sensors::{ChannelId, CHANNEL_COUNT};

// ── Port call record ──────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum PortCall {
    Heater { zone: Zone, on: bool },
    Fan { fan: FanId, duty: u8 },
    Cooling(bool),
}

// ── MockStation ───────────────────────────────────────────────

/// Thermocouple readings are set by the test; outputs are recorded.
pub struct MockStation {
    pub readings: [Result<f32, ThermocoupleError>; CHANNEL_COUNT],
    pub calls: Vec<PortCall>,
}

#[allow(dead_code)]
impl MockStation {
    /// Every channel reads `celsius`.
    pub fn at(celsius: f32) -> Self {
        Self {
            readings: [Ok(celsius); CHANNEL_COUNT],
            calls: Vec::new(),
        }
    }

    pub fn set(&mut self, channel: ChannelId, celsius: f32) {
        self.readings[channel.index()] = Ok(celsius);
    }

    pub fn set_all(&mut self, celsius: f32) {
        self.readings = [Ok(celsius); CHANNEL_COUNT];
    }

    pub fn fail(&mut self, channel: ChannelId, error: ThermocoupleError) {
        self.readings[channel.index()] = Err(error);
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Heater writes, in call order.
    pub fn heater_calls(&self) -> Vec<(Zone, bool)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                PortCall::Heater { zone, on } => Some((*zone, *on)),
                _ => None,
            })
            .collect()
    }

    pub fn heater_on(&self, zone: Zone) -> bool {
        self.calls
            .iter()
            .rev()
            .find_map(|c| match c {
                PortCall::Heater { zone: z, on } if *z == zone => Some(*on),
                _ => None,
            })
            .unwrap_or(false)
    }

    pub fn fan_duty(&self, fan: FanId) -> Option<u8> {
        self.calls.iter().rev().find_map(|c| match c {
            PortCall::Fan { fan: f, duty } if *f == fan => Some(*duty),
            _ => None,
        })
    }

    pub fn cooling_on(&self) -> bool {
        self.calls
            .iter()
            .rev()
            .find_map(|c| match c {
                PortCall::Cooling(on) => Some(*on),
                _ => None,
            })
            .unwrap_or(false)
    }
}

impl ThermocouplePort for MockStation {
    fn read(&mut self, channel: ChannelId) -> Result<f32, ThermocoupleError> {
        self.readings[channel.index()]
    }
}

impl HeaterPort for MockStation {
    fn set_heater(&mut self, zone: Zone, on: bool) {
        self.calls.push(PortCall::Heater { zone, on });
    }
}

impl FanPort for MockStation {
    fn set_fan(&mut self, fan: FanId, duty: u8) {
        self.calls.push(PortCall::Fan { fan, duty });
    }

    fn set_cooling(&mut self, on: bool) {
        self.calls.push(PortCall::Cooling(on));
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    pub fn contains(&self, event: &AppEvent) -> bool {
        self.events.contains(event)
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── VecLog ────────────────────────────────────────────────────

#[derive(Default)]
pub struct VecLog {
    pub rows: Vec<LogRow>,
}

impl ProcessLog for VecLog {
    fn append_row(&mut self, row: &LogRow) {
        self.rows.push(row.clone());
    }
}
