//! Solid-state relay heater output on a GPIO.
//!
//! Dumb actuator: the on/off decision comes from the time-proportional
//! SSR layer, this driver only tracks the level it last wrote.  A failed
//! pin write is logged and leaves `is_on()` reporting the old level.

use embedded_hal::digital::OutputPin;
use log::warn;

pub struct SsrPin<P> {
    pin: P,
    on: bool,
    write_errors: u32,
}

impl<P: OutputPin> SsrPin<P> {
    /// Wrap `pin` and drive it low.
    pub fn new(mut pin: P) -> Self {
        let write_errors = u32::from(pin.set_low().is_err());
        Self {
            pin,
            on: false,
            write_errors,
        }
    }

    pub fn set(&mut self, on: bool) {
        let result = if on {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        match result {
            Ok(()) => self.on = on,
            Err(_) => {
                self.write_errors = self.write_errors.saturating_add(1);
                warn!("SSR: pin write failed (total {})", self.write_errors);
            }
        }
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    pub fn write_errors(&self) -> u32 {
        self.write_errors
    }
}
