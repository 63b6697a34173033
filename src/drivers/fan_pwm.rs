//! Heating-zone fan and cooling-airflow drivers.
//!
//! - [`FanPwm`]: PWM fan, duty in percent via `SetDutyCycle`.
//! - The cooling airflow output is a plain GPIO, driven with [`SsrPin`].
//!
//! [`SsrPin`]: super::ssr_pin::SsrPin

use embedded_hal::pwm::SetDutyCycle;
use log::warn;

pub struct FanPwm<PWM> {
    pwm: PWM,
    duty: u8,
}

impl<PWM: SetDutyCycle> FanPwm<PWM> {
    pub fn new(pwm: PWM) -> Self {
        Self { pwm, duty: 0 }
    }

    /// Set duty (0–100 %).  Values above 100 are clamped.
    pub fn set_duty(&mut self, percent: u8) {
        let percent = percent.min(100);
        match self.pwm.set_duty_cycle_percent(percent) {
            Ok(()) => self.duty = percent,
            Err(_) => warn!("FAN: PWM update to {}% failed", percent),
        }
    }

    pub fn duty(&self) -> u8 {
        self.duty
    }
}
