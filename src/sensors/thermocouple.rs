//! Thermocouple channel validation with fault hysteresis.
//!
//! An open or shorted thermocouple shows up as a reading far outside the
//! physically plausible window (or as a converter sentinel error).  Each
//! implausible sample bumps a fault counter; the channel only reports
//! disconnected once the counter exceeds the threshold, so a single bad
//! SPI frame does not flap the status.
//!
//! While faulted the filtered value is frozen at the last good reading
//! (fail-frozen, not fail-zero) so the max-temperature safety check keeps
//! working from the last known-good value.

use crate::config::ControllerConfig;
use crate::error::ThermocoupleError;

/// One validated sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelReading {
    /// Filtered temperature (°C): the raw value when plausible, else the
    /// last valid value.
    pub celsius: f32,
    /// False once more than `fault_threshold` consecutive samples failed.
    pub connected: bool,
}

impl Default for ChannelReading {
    fn default() -> Self {
        Self {
            celsius: 0.0,
            connected: true,
        }
    }
}

/// Per-channel validation state.
#[derive(Debug, Clone)]
pub struct TemperatureChannel {
    min_c: f32,
    max_c: f32,
    threshold: u8,
    raw: Option<f32>,
    fault_count: u8,
    connected: bool,
    last_valid_c: f32,
    last_valid_ms: Option<u64>,
}

impl TemperatureChannel {
    pub fn new(config: &ControllerConfig) -> Self {
        Self {
            min_c: config.plausible_min_c,
            max_c: config.plausible_max_c,
            threshold: config.fault_threshold,
            raw: None,
            fault_count: 0,
            connected: true,
            last_valid_c: 0.0,
            last_valid_ms: None,
        }
    }

    /// Validate one raw sample taken at `now_ms`.
    pub fn validate(
        &mut self,
        raw: Result<f32, ThermocoupleError>,
        now_ms: u64,
    ) -> ChannelReading {
        self.raw = raw.ok();
        match raw {
            Ok(celsius) if self.is_plausible(celsius) => {
                self.fault_count = 0;
                self.connected = true;
                self.last_valid_c = celsius;
                self.last_valid_ms = Some(now_ms);
            }
            _ => {
                self.fault_count = self.fault_count.saturating_add(1);
                if self.fault_count > self.threshold {
                    self.connected = false;
                }
            }
        }
        self.reading()
    }

    /// Current filtered output without taking a new sample.
    pub fn reading(&self) -> ChannelReading {
        ChannelReading {
            celsius: self.last_valid_c,
            connected: self.connected,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn fault_count(&self) -> u8 {
        self.fault_count
    }

    /// Last raw value handed to [`validate`](Self::validate); `None` if the
    /// reader returned a sentinel error.
    pub fn raw(&self) -> Option<f32> {
        self.raw
    }

    /// Timestamp of the last plausible reading.
    pub fn last_valid_ms(&self) -> Option<u64> {
        self.last_valid_ms
    }

    fn is_plausible(&self, celsius: f32) -> bool {
        // NaN fails both comparisons.
        celsius >= self.min_c && celsius <= self.max_c
    }
}
