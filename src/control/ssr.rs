//! Time-proportional SSR drive.
//!
//! A solid-state relay is switched, not dimmed.  A `p` % output becomes
//! "on for the first `p` % of every window": the window restarts every
//! `window_ms` of absolute time, and the on/off decision is re-evaluated
//! on each sample tick against the current `p`.
//!
//! ```text
//!   p = 30, W = 1000 ms
//!   ┌──────┐              ┌──────┐
//!   │  ON  │     OFF      │  ON  │     OFF
//!   ┘      └──────────────┘      └──────────────
//!   0     300           1000   1300          2000  ms
//! ```

use super::ZONE_COUNT;

#[derive(Debug, Clone, Copy)]
pub struct SsrActuator {
    window_ms: u32,
}

impl SsrActuator {
    pub fn new(window_ms: u32) -> Self {
        Self {
            window_ms: window_ms.max(1),
        }
    }

    pub fn window_ms(&self) -> u32 {
        self.window_ms
    }

    /// On-time within one window for `percent` output.
    pub fn on_time_ms(&self, percent: f32) -> f32 {
        let p = if percent.is_nan() {
            0.0
        } else {
            percent.clamp(0.0, 100.0)
        };
        p * self.window_ms as f32 / 100.0
    }

    /// Drive level for a single zone at `now_ms`.
    pub fn is_on(&self, percent: f32, now_ms: u64) -> bool {
        let time_in_window = (now_ms % u64::from(self.window_ms)) as f32;
        time_in_window < self.on_time_ms(percent)
    }

    /// Drive levels for every zone.
    pub fn drive(&self, outputs: &[f32; ZONE_COUNT], now_ms: u64) -> [bool; ZONE_COUNT] {
        core::array::from_fn(|i| self.is_on(outputs[i], now_ms))
    }
}
