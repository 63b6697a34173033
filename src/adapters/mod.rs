//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter         | Implements         | Connects to                  |
//! |-----------------|--------------------|------------------------------|
//! | `hardware`      | ThermocouplePort   | MAX6675 converters over SPI  |
//! |                 | HeaterPort         | SSR GPIOs                    |
//! |                 | FanPort            | fan PWM, cooling GPIO        |
//! | `sim`           | ThermocouplePort   | first-order plant model      |
//! |                 | HeaterPort/FanPort |                              |
//! | `log_sink`      | EventSink          | `log` facade                 |
//! | `feedback_sink` | EventSink          | operator feedback queue      |
//! | `storage`       | ConfigPort         | in-memory key-value store    |
//! |                 | ProfileStore       |                              |
//! |                 | StoragePort        |                              |
//! | `process_log`   | ProcessLog         | RAM ring buffer, CSV stream  |
//! | `time`          | Clock              | `std::time::Instant`         |

pub mod feedback_sink;
pub mod hardware;
pub mod log_sink;
pub mod process_log;
pub mod sim;
pub mod storage;
pub mod time;
