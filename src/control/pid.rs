//! PID controller for one heating zone
//!
//! Positional PID with clamped-integral anti-windup: the integral term is
//! accumulated already multiplied by `Ki` and is itself clamped to the
//! output range, so it can never wind past what the heater can deliver.
//! Each controller embeds an autotune sub-state-machine, see
//! [`super::autotune`].

use serde::{Deserialize, Serialize};

use super::autotune::{Autotune, AutotuneReport, AutotuneSettings, AutotuneStep};

/// Proportional / integral / derivative gains.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidGains {
    #[serde(rename = "Kp")]
    pub kp: f32,
    #[serde(rename = "Ki")]
    pub ki: f32,
    #[serde(rename = "Kd", default)]
    pub kd: f32,
}

impl PidGains {
    pub const fn new(kp: f32, ki: f32, kd: f32) -> Self {
        Self { kp, ki, kd }
    }
}

impl Default for PidGains {
    fn default() -> Self {
        Self::new(2.0, 0.1, 0.0)
    }
}

/// PID controller
#[derive(Debug, Clone)]
pub struct PidController {
    gains: PidGains,
    integral: f32,
    last_error: f32,
    output_min: f32,
    output_max: f32,
    enabled: bool,
    autotune: Autotune,
}

impl PidController {
    pub fn new(gains: PidGains) -> Self {
        Self {
            gains,
            integral: 0.0,
            last_error: 0.0,
            output_min: 0.0,
            output_max: 100.0,
            enabled: true,
            autotune: Autotune::default(),
        }
    }

    pub fn gains(&self) -> PidGains {
        self.gains
    }

    pub fn set_gains(&mut self, gains: PidGains) {
        self.gains = gains;
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn integral(&self) -> f32 {
        self.integral
    }

    pub fn output_limits(&self) -> (f32, f32) {
        (self.output_min, self.output_max)
    }

    /// Compute the heater output (percent) for one sample.
    ///
    /// A disabled controller returns 0 and leaves its state untouched.
    pub fn step(&mut self, target: f32, current: f32, dt: f32) -> f32 {
        if !self.enabled {
            return 0.0;
        }

        let error = target - current;

        let increment = error * self.gains.ki * dt;
        if increment.is_finite() {
            self.integral = (self.integral + increment).clamp(self.output_min, self.output_max);
        }

        let derivative = if dt > 0.0 {
            (error - self.last_error) / dt
        } else {
            0.0
        };
        if error.is_finite() {
            self.last_error = error;
        }

        let output = error * self.gains.kp + self.integral + derivative * self.gains.kd;
        if output.is_nan() {
            return self.output_min;
        }
        output.clamp(self.output_min, self.output_max)
    }

    /// Reset controller state (integral and derivative history).
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.last_error = 0.0;
    }

    // ── Autotune ──────────────────────────────────────────────

    /// Begin an autotune run towards `target`.  Clears the integral and
    /// restarts the autotune timer at `now_ms`.
    pub fn start_autotune(&mut self, target: f32, now_ms: u64, settings: AutotuneSettings) {
        self.reset();
        self.autotune.start(target, now_ms, settings);
    }

    pub fn is_autotuning(&self) -> bool {
        self.autotune.is_active()
    }

    /// True once an autotune converged and its gains were applied.
    pub fn is_autotuned(&self) -> bool {
        self.autotune.is_autotuned()
    }

    /// Abandon a running autotune without touching the gains.
    pub fn cancel_autotune(&mut self) {
        self.autotune.cancel();
    }

    /// Advance the autotune by one sample.  Returns `None` when no autotune
    /// is running.  On completion the resulting gains are installed.
    pub fn autotune_step(&mut self, current: f32, now_ms: u64) -> Option<AutotuneStep> {
        let step = self.autotune.step(current, now_ms)?;
        if let AutotuneStep::Finished(AutotuneReport { gains, .. }) = step {
            self.gains = gains;
            self.reset();
        }
        Some(step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(kp: f32, ki: f32, kd: f32) -> PidController {
        PidController::new(PidGains::new(kp, ki, kd))
    }

    #[test]
    fn proportional_only() {
        let mut p = pid(2.0, 0.0, 0.0);
        assert_eq!(p.step(100.0, 90.0, 0.2), 20.0);
        assert_eq!(p.integral(), 0.0);
    }

    #[test]
    fn output_clamped_to_range() {
        let mut p = pid(10.0, 0.0, 0.0);
        assert_eq!(p.step(300.0, 20.0, 0.2), 100.0);
        assert_eq!(p.step(20.0, 300.0, 0.2), 0.0);
    }

    #[test]
    fn integral_accumulates_with_ki_and_dt() {
        let mut p = pid(0.0, 0.5, 0.0);
        let out = p.step(110.0, 100.0, 0.2);
        // 10 * 0.5 * 0.2
        assert!((p.integral() - 1.0).abs() < 1e-6);
        assert!((out - 1.0).abs() < 1e-6);
    }

    #[test]
    fn integral_clamped_at_output_max() {
        let mut p = pid(0.0, 10.0, 0.0);
        for _ in 0..1000 {
            p.step(500.0, 20.0, 0.2);
        }
        assert_eq!(p.integral(), 100.0);
        for _ in 0..1000 {
            p.step(20.0, 500.0, 0.2);
        }
        assert_eq!(p.integral(), 0.0);
    }

    #[test]
    fn derivative_uses_error_delta() {
        let mut p = pid(0.0, 0.0, 1.0);
        p.step(100.0, 90.0, 0.5); // error 10, from 0: derivative 20
        let out = p.step(100.0, 95.0, 0.5); // error 5: derivative -10 -> clamped
        assert_eq!(out, 0.0);
        let out = p.step(100.0, 93.0, 0.5); // error 7: derivative 4
        assert!((out - 4.0).abs() < 1e-5);
    }

    #[test]
    fn zero_dt_skips_derivative() {
        let mut p = pid(1.0, 0.0, 5.0);
        assert_eq!(p.step(50.0, 40.0, 0.0), 10.0);
    }

    #[test]
    fn disabled_returns_zero_without_side_effects() {
        let mut p = pid(2.0, 1.0, 1.0);
        p.step(200.0, 100.0, 0.2);
        let integral = p.integral();
        p.set_enabled(false);
        assert_eq!(p.step(200.0, 20.0, 0.2), 0.0);
        assert_eq!(p.integral(), integral);
    }

    #[test]
    fn nan_measurement_does_not_poison_integral() {
        let mut p = pid(1.0, 1.0, 0.0);
        p.step(100.0, 90.0, 0.2);
        let integral = p.integral();
        let out = p.step(100.0, f32::NAN, 0.2);
        assert_eq!(p.integral(), integral);
        assert_eq!(out, 0.0);
    }

    #[test]
    fn reset_clears_history() {
        let mut p = pid(1.0, 1.0, 1.0);
        p.step(100.0, 50.0, 0.2);
        p.reset();
        assert_eq!(p.integral(), 0.0);
    }

    #[test]
    fn gains_serialise_with_wire_names() {
        let json = serde_json::to_string(&PidGains::new(2.5, 0.1, 0.0)).unwrap();
        assert_eq!(json, r#"{"Kp":2.5,"Ki":0.1,"Kd":0.0}"#);
        let g: PidGains = serde_json::from_str(r#"{"Kp":2.0,"Ki":0.08}"#).unwrap();
        assert_eq!(g.kd, 0.0);
    }
}
