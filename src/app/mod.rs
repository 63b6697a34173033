//! Application core: pure control logic, zero I/O.
//!
//! Process sequencing, safety evaluation, PID regulation and SSR
//! actuation for the reflow station.  All interaction with hardware
//! happens through the **port traits** in [`ports`], keeping this layer
//! fully testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
pub mod snapshot;
