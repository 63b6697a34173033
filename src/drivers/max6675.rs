//! MAX6675 K-type thermocouple converter over SPI.
//!
//! One 16-bit big-endian frame per conversion:
//!
//! ```text
//!  15   14 ............ 3    2      1     0
//! ┌───┬──────────────────┬──────┬──────┬─────┐
//! │ 0 │ 12-bit temp/0.25 │ open │ id=0 │ tri │
//! └───┴──────────────────┴──────┴──────┴─────┘
//! ```
//!
//! Bit 2 set means the thermocouple input is open.  A dummy sign bit or
//! device-id bit that is not zero points at a broken bus (MISO stuck
//! high, no chip present).

use embedded_hal::spi::SpiDevice;

use crate::error::ThermocoupleError;

const OPEN_INPUT: u16 = 1 << 2;
const DEVICE_ID: u16 = 1 << 1;
const DUMMY_SIGN: u16 = 1 << 15;

/// Degrees per LSB.
const RESOLUTION_C: f32 = 0.25;

pub struct Max6675<SPI> {
    spi: SPI,
}

impl<SPI: SpiDevice> Max6675<SPI> {
    pub fn new(spi: SPI) -> Self {
        Self { spi }
    }

    /// Read one conversion in °C.
    pub fn read_celsius(&mut self) -> Result<f32, ThermocoupleError> {
        let mut frame = [0u8; 2];
        self.spi
            .read(&mut frame)
            .map_err(|_| ThermocoupleError::BusError)?;
        decode(u16::from_be_bytes(frame))
    }

    pub fn release(self) -> SPI {
        self.spi
    }
}

/// Decode a raw MAX6675 frame.
pub fn decode(raw: u16) -> Result<f32, ThermocoupleError> {
    if raw & (DUMMY_SIGN | DEVICE_ID) != 0 {
        return Err(ThermocoupleError::BusError);
    }
    if raw & OPEN_INPUT != 0 {
        return Err(ThermocoupleError::OpenCircuit);
    }
    Ok(f32::from(raw >> 3) * RESOLUTION_C)
}
