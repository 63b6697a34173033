//! Peripheral drivers over the embedded-hal 1.0 traits.

pub mod fan_pwm;
pub mod max6675;
pub mod ssr_pin;
