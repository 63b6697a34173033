//! Fuzz target: MAX6675 frame decoding
//!
//! Every 16-bit frame must decode to either an error or a temperature
//! inside the converter's 0 to 1023.75 °C range.
//!
//! cargo fuzz run fuzz_max6675_frame

#![no_main]

use libfuzzer_sys::fuzz_target;
use reflowstation::drivers::max6675::decode;

fuzz_target!(|data: [u8; 2]| {
    let raw = u16::from_be_bytes(data);
    if let Ok(celsius) = decode(raw) {
        assert!((0.0..=1023.75).contains(&celsius), "{raw:#06x} -> {celsius}");
        assert_eq!(raw & 0b110, 0);
    }
});
