//! Fuzz target: control tick under arbitrary readings
//!
//! Drives a running profile with fuzz-chosen thermocouple values and
//! bus errors.  Heaters must never be commanded outside an active run.
//!
//! cargo fuzz run fuzz_controller_tick

#![no_main]

use libfuzzer_sys::fuzz_target;
use reflowstation::app::events::{AppEvent, LogRow};
use reflowstation::app::ports::{EventSink, FanPort, HeaterPort, ProcessLog, ThermocouplePort};
use reflowstation::app::service::AppService;
use reflowstation::config::ControllerConfig;
use reflowstation::control::fan::FanId;
use reflowstation::control::Zone;
use reflowstation::error::ThermocoupleError;
use reflowstation::profile::Profile;
use reflowstation::sensors::ChannelId;

struct Frames<'a> {
    data: &'a [u8],
    heaters: [bool; 3],
}

impl ThermocouplePort for Frames<'_> {
    fn read(&mut self, _channel: ChannelId) -> Result<f32, ThermocoupleError> {
        let Some((&b, rest)) = self.data.split_first() else {
            return Ok(25.0);
        };
        self.data = rest;
        match b {
            0 => Err(ThermocoupleError::OpenCircuit),
            1 => Err(ThermocoupleError::BusError),
            _ => Ok(f32::from(b) * 1.25),
        }
    }
}

impl HeaterPort for Frames<'_> {
    fn set_heater(&mut self, zone: Zone, on: bool) {
        self.heaters[zone.index()] = on;
    }
}

impl FanPort for Frames<'_> {
    fn set_fan(&mut self, _fan: FanId, duty: u8) {
        assert!(duty <= 100);
    }
    fn set_cooling(&mut self, _on: bool) {}
}

struct Quiet;

impl EventSink for Quiet {
    fn emit(&mut self, _event: &AppEvent) {}
}

impl ProcessLog for Quiet {
    fn append_row(&mut self, _row: &LogRow) {}
}

fuzz_target!(|data: &[u8]| {
    let mut app = AppService::new(ControllerConfig::default());
    let mut hw = Frames { data, heaters: [false; 3] };
    let mut log = Quiet;
    let mut sink = Quiet;
    if app.start(Profile::lead_free_bga(), &mut sink).is_err() {
        return;
    }

    let mut now = 0u64;
    while !hw.data.is_empty() {
        app.tick(now, &mut hw, &mut log, &mut sink);
        if !app.state().is_active() {
            assert!(hw.heaters.iter().all(|&on| !on));
        }
        now += 200;
    }
});
