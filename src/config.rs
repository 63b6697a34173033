//! Controller configuration parameters
//!
//! All tunable constants for the thermal control core.
//! Values can be overridden via the config store or a JSON file on the
//! simulator command line.

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;

/// Core controller configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    // --- Timing ---
    /// Sampling tick period (milliseconds)
    pub sample_period_ms: u32,
    /// SSR time-proportioning window (milliseconds)
    pub ssr_window_ms: u32,

    // --- Thermocouple validation ---
    /// Lowest plausible reading (Celsius)
    pub plausible_min_c: f32,
    /// Highest plausible reading (Celsius)
    pub plausible_max_c: f32,
    /// Consecutive implausible readings tolerated before disconnect
    pub fault_threshold: u8,

    // --- Autotune ---
    /// Autotune gives up after this long (milliseconds)
    pub autotune_timeout_ms: u32,
    /// Band around the target that counts as converged (Celsius)
    pub autotune_band_c: f32,
    /// Heater drive while below target during autotune (percent)
    pub autotune_drive_percent: f32,
    /// Over-temperature limit applied while autotuning (no profile loaded)
    pub autotune_over_temp_limit_c: f32,

    // --- Fans ---
    /// Heating-zone fan duty when nothing else is asked for (percent)
    pub idle_fan_duty: u8,
    /// Cooling-rate intent applied after a run finishes or aborts
    pub post_run_cooling_rate: f32,
    /// Cooling airflow switches off once every channel is below this
    pub cooldown_complete_c: f32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            // Timing
            sample_period_ms: 200, // 5 Hz
            ssr_window_ms: 1000,

            // Thermocouple validation
            plausible_min_c: 5.0,
            plausible_max_c: 500.0,
            fault_threshold: 5,

            // Autotune
            autotune_timeout_ms: 60_000,
            autotune_band_c: 2.0,
            autotune_drive_percent: 50.0,
            autotune_over_temp_limit_c: 280.0,

            // Fans
            idle_fan_duty: 20,
            post_run_cooling_rate: 2.0,
            cooldown_complete_c: 50.0,
        }
    }
}

impl ControllerConfig {
    /// Nominal tick length in seconds (fallback `dt` for the first sample).
    pub fn sample_period_secs(&self) -> f32 {
        self.sample_period_ms as f32 / 1000.0
    }
}

/// Range-check a configuration before it is used or persisted.
pub fn validate_config(cfg: &ControllerConfig) -> Result<(), ConfigError> {
    if !(50..=1000).contains(&cfg.sample_period_ms) {
        return Err(ConfigError::ValidationFailed(
            "sample_period_ms must be 50–1000",
        ));
    }
    if !(100..=10_000).contains(&cfg.ssr_window_ms) {
        return Err(ConfigError::ValidationFailed(
            "ssr_window_ms must be 100–10000",
        ));
    }
    if !(cfg.plausible_min_c < cfg.plausible_max_c) {
        return Err(ConfigError::ValidationFailed(
            "plausible_min_c must be below plausible_max_c",
        ));
    }
    if cfg.fault_threshold == 0 {
        return Err(ConfigError::ValidationFailed(
            "fault_threshold must be at least 1",
        ));
    }
    if !(1_000..=600_000).contains(&cfg.autotune_timeout_ms) {
        return Err(ConfigError::ValidationFailed(
            "autotune_timeout_ms must be 1000–600000",
        ));
    }
    if !(cfg.autotune_band_c > 0.0) {
        return Err(ConfigError::ValidationFailed(
            "autotune_band_c must be positive",
        ));
    }
    if !(0.0..=100.0).contains(&cfg.autotune_drive_percent) {
        return Err(ConfigError::ValidationFailed(
            "autotune_drive_percent must be 0–100",
        ));
    }
    if !(cfg.autotune_over_temp_limit_c > cfg.plausible_min_c
        && cfg.autotune_over_temp_limit_c <= cfg.plausible_max_c)
    {
        return Err(ConfigError::ValidationFailed(
            "autotune_over_temp_limit_c must lie inside the plausible range",
        ));
    }
    // Heating-zone fans never fully stop.
    if !(1..=100).contains(&cfg.idle_fan_duty) {
        return Err(ConfigError::ValidationFailed("idle_fan_duty must be 1–100"));
    }
    if !(cfg.post_run_cooling_rate >= 0.0) {
        return Err(ConfigError::ValidationFailed(
            "post_run_cooling_rate must not be negative",
        ));
    }
    if !cfg.cooldown_complete_c.is_finite() {
        return Err(ConfigError::ValidationFailed(
            "cooldown_complete_c must be finite",
        ));
    }
    Ok(())
}
