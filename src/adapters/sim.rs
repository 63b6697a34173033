//! Simulated station for host runs and end-to-end tests.
//!
//! Each heating zone is a first-order thermal mass: heating at a fixed
//! rate while its SSR is on, losing heat towards ambient in proportion to
//! the temperature rise.  Zone fans and the cooling airflow add to the
//! loss.  The external probe sits on the board and lags behind the mean
//! of the three zones.
//!
//! ```text
//!   dT/dt = heat·on − (T − ambient)·(loss + fan·duty + cooling·on)
//! ```
//!
//! Faults can be injected per channel (sentinel errors or a forced
//! reading) to exercise the validation and safety paths.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::app::ports::{FanPort, HeaterPort, ThermocouplePort};
use crate::control::fan::FanId;
use crate::control::{Zone, ZONE_COUNT};
use crate::error::ThermocoupleError;
use crate::sensors::{ChannelId, CHANNEL_COUNT};

/// Plant model coefficients.  Rates are per second.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlantParams {
    pub ambient_c: f32,
    /// Heating rate per zone at full SSR duty (°C/s).
    pub heat_rate: [f32; ZONE_COUNT],
    /// Passive loss coefficient.
    pub loss: f32,
    /// Extra loss at 100 % fan duty.
    pub fan_loss: f32,
    /// Extra loss with the cooling airflow on.
    pub cooling_loss: f32,
    /// How fast the external probe follows the zones.
    pub probe_coupling: f32,
}

impl Default for PlantParams {
    fn default() -> Self {
        Self {
            ambient_c: 25.0,
            heat_rate: [3.0, 2.5, 1.5],
            loss: 0.004,
            fan_loss: 0.004,
            cooling_loss: 0.03,
            probe_coupling: 0.05,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Injected {
    Error(ThermocoupleError),
    Reading(f32),
}

pub struct SimulatedStation {
    params: PlantParams,
    temps: [f32; CHANNEL_COUNT],
    heaters: [bool; ZONE_COUNT],
    fans: [u8; 2],
    cooling: bool,
    injected: [Option<Injected>; CHANNEL_COUNT],
    elapsed_ms: u64,
}

impl SimulatedStation {
    /// Every channel starts at ambient.
    pub fn new(params: PlantParams) -> Self {
        let ambient = params.ambient_c;
        Self {
            params,
            temps: [ambient; CHANNEL_COUNT],
            heaters: [false; ZONE_COUNT],
            fans: [0; 2],
            cooling: false,
            injected: [None; CHANNEL_COUNT],
            elapsed_ms: 0,
        }
    }

    pub fn params(&self) -> &PlantParams {
        &self.params
    }

    /// True plant temperature, ignoring injected faults.
    pub fn temperature(&self, channel: ChannelId) -> f32 {
        self.temps[channel.index()]
    }

    pub fn set_temperature(&mut self, channel: ChannelId, celsius: f32) {
        self.temps[channel.index()] = celsius;
    }

    pub fn heater_on(&self, zone: Zone) -> bool {
        self.heaters[zone.index()]
    }

    pub fn fan_duty(&self, fan: FanId) -> u8 {
        self.fans[fan as usize]
    }

    pub fn cooling_on(&self) -> bool {
        self.cooling
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    // ── Fault injection ───────────────────────────────────────

    /// Make `channel` report a converter error until cleared.
    pub fn inject_error(&mut self, channel: ChannelId, error: ThermocoupleError) {
        self.injected[channel.index()] = Some(Injected::Error(error));
    }

    /// Make `channel` report a fixed value until cleared.
    pub fn inject_reading(&mut self, channel: ChannelId, celsius: f32) {
        self.injected[channel.index()] = Some(Injected::Reading(celsius));
    }

    pub fn clear_fault(&mut self, channel: ChannelId) {
        self.injected[channel.index()] = None;
    }

    // ── Dynamics ──────────────────────────────────────────────

    /// Integrate the plant forward by `dt_ms`, using the outputs most
    /// recently written through the ports.
    pub fn advance(&mut self, dt_ms: u64) {
        self.elapsed_ms = self.elapsed_ms.saturating_add(dt_ms);
        let dt = dt_ms as f32 / 1000.0;
        let p = &self.params;
        let cooling = if self.cooling { p.cooling_loss } else { 0.0 };

        for zone in Zone::ALL {
            let i = zone.index();
            let fan = match zone {
                Zone::Top => f32::from(self.fans[0]),
                Zone::Bottom => f32::from(self.fans[1]),
                Zone::Ir => 0.0,
            } / 100.0;
            let heat = if self.heaters[i] { p.heat_rate[i] } else { 0.0 };
            let rise = self.temps[i] - p.ambient_c;
            let loss = rise * (p.loss + p.fan_loss * fan + cooling);
            self.temps[i] += (heat - loss) * dt;
        }

        let ext = ChannelId::External.index();
        let mean = self.temps[..ZONE_COUNT].iter().sum::<f32>() / ZONE_COUNT as f32;
        let rise = self.temps[ext] - p.ambient_c;
        self.temps[ext] += (p.probe_coupling * (mean - self.temps[ext]) - rise * cooling) * dt;
    }
}

impl Default for SimulatedStation {
    fn default() -> Self {
        Self::new(PlantParams::default())
    }
}

impl ThermocouplePort for SimulatedStation {
    fn read(&mut self, channel: ChannelId) -> Result<f32, ThermocoupleError> {
        match self.injected[channel.index()] {
            Some(Injected::Error(e)) => Err(e),
            Some(Injected::Reading(c)) => Ok(c),
            None => Ok(self.temps[channel.index()]),
        }
    }
}

impl HeaterPort for SimulatedStation {
    fn set_heater(&mut self, zone: Zone, on: bool) {
        if self.heaters[zone.index()] != on {
            debug!("sim: {:?} heater {}", zone, if on { "on" } else { "off" });
        }
        self.heaters[zone.index()] = on;
    }
}

impl FanPort for SimulatedStation {
    fn set_fan(&mut self, fan: FanId, duty: u8) {
        self.fans[fan as usize] = duty.min(100);
    }

    fn set_cooling(&mut self, on: bool) {
        self.cooling = on;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heater_raises_only_its_zone() {
        let mut sim = SimulatedStation::default();
        sim.set_heater(Zone::Top, true);
        for _ in 0..50 {
            sim.advance(200);
        }
        assert!(sim.temperature(ChannelId::Top) > 50.0);
        assert_eq!(sim.temperature(ChannelId::Bottom), 25.0);
        assert!(sim.temperature(ChannelId::External) > 25.0);
        assert_eq!(sim.elapsed_ms(), 10_000);
    }

    #[test]
    fn cooling_pulls_towards_ambient() {
        let mut sim = SimulatedStation::default();
        sim.set_temperature(ChannelId::Bottom, 200.0);
        let mut passive = SimulatedStation::default();
        passive.set_temperature(ChannelId::Bottom, 200.0);
        sim.set_cooling(true);
        sim.set_fan(FanId::Bottom, 100);
        for _ in 0..20 {
            sim.advance(500);
            passive.advance(500);
        }
        assert!(sim.temperature(ChannelId::Bottom) < passive.temperature(ChannelId::Bottom));
        assert!(sim.temperature(ChannelId::Bottom) > 25.0);
    }

    #[test]
    fn injected_faults_override_plant() {
        let mut sim = SimulatedStation::default();
        sim.inject_error(ChannelId::Ir, ThermocoupleError::OpenCircuit);
        sim.inject_reading(ChannelId::External, 300.0);
        assert_eq!(sim.read(ChannelId::Ir), Err(ThermocoupleError::OpenCircuit));
        assert_eq!(sim.read(ChannelId::External), Ok(300.0));
        assert_eq!(sim.read(ChannelId::Top), Ok(25.0));
        sim.clear_fault(ChannelId::Ir);
        assert_eq!(sim.read(ChannelId::Ir), Ok(25.0));
    }
}
