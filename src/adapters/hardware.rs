//! Hardware adapter: bridges the station's peripherals to the domain
//! port traits.
//!
//! Owns four MAX6675 converters, three heater SSRs, the two zone fans and
//! the cooling airflow output, exposing them through
//! [`ThermocouplePort`], [`HeaterPort`] and [`FanPort`].  This is the only
//! module that touches real pins; everything is generic over the
//! embedded-hal traits so any HAL (or a test double) plugs in.

use embedded_hal::digital::OutputPin;
use embedded_hal::pwm::SetDutyCycle;
use embedded_hal::spi::SpiDevice;

use crate::app::ports::{FanPort, HeaterPort, ThermocouplePort};
use crate::control::fan::FanId;
use crate::control::{Zone, ZONE_COUNT};
use crate::drivers::fan_pwm::FanPwm;
use crate::drivers::max6675::Max6675;
use crate::drivers::ssr_pin::SsrPin;
use crate::error::ThermocoupleError;
use crate::sensors::{ChannelId, CHANNEL_COUNT};

/// Concrete adapter that combines all station hardware behind port traits.
pub struct StationHardware<SPI, PIN, PWM> {
    thermocouples: [Max6675<SPI>; CHANNEL_COUNT],
    heaters: [SsrPin<PIN>; ZONE_COUNT],
    fans: [FanPwm<PWM>; 2],
    cooling: SsrPin<PIN>,
}

impl<SPI, PIN, PWM> StationHardware<SPI, PIN, PWM>
where
    SPI: SpiDevice,
    PIN: OutputPin,
    PWM: SetDutyCycle,
{
    /// Arrays are indexed by [`ChannelId`], [`Zone`] and [`FanId`] order.
    pub fn new(
        thermocouples: [SPI; CHANNEL_COUNT],
        heaters: [PIN; ZONE_COUNT],
        fans: [PWM; 2],
        cooling: PIN,
    ) -> Self {
        Self {
            thermocouples: thermocouples.map(Max6675::new),
            heaters: heaters.map(SsrPin::new),
            fans: fans.map(FanPwm::new),
            cooling: SsrPin::new(cooling),
        }
    }

    pub fn heater_on(&self, zone: Zone) -> bool {
        self.heaters[zone.index()].is_on()
    }

    pub fn fan_duty(&self, fan: FanId) -> u8 {
        self.fans[fan_index(fan)].duty()
    }

    pub fn cooling_on(&self) -> bool {
        self.cooling.is_on()
    }
}

fn fan_index(fan: FanId) -> usize {
    match fan {
        FanId::Top => 0,
        FanId::Bottom => 1,
    }
}

// ── ThermocouplePort ──────────────────────────────────────────

impl<SPI: SpiDevice, PIN, PWM> ThermocouplePort for StationHardware<SPI, PIN, PWM> {
    fn read(&mut self, channel: ChannelId) -> Result<f32, ThermocoupleError> {
        self.thermocouples[channel.index()].read_celsius()
    }
}

// ── Output ports ──────────────────────────────────────────────

impl<SPI, PIN: OutputPin, PWM> HeaterPort for StationHardware<SPI, PIN, PWM> {
    fn set_heater(&mut self, zone: Zone, on: bool) {
        self.heaters[zone.index()].set(on);
    }
}

impl<SPI, PIN: OutputPin, PWM: SetDutyCycle> FanPort for StationHardware<SPI, PIN, PWM> {
    fn set_fan(&mut self, fan: FanId, duty: u8) {
        self.fans[fan_index(fan)].set_duty(duty);
    }

    fn set_cooling(&mut self, on: bool) {
        self.cooling.set(on);
    }
}
