//! Reflow station thermal control core.
//!
//! Pure-logic modules (sensors, control, FSM, safety, service) plus the
//! adapters that bind them to real peripherals or to the host plant
//! model.  Everything below `app` is hardware independent and runs in
//! integration tests against mock ports.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod control;
pub mod drivers;
pub mod error;
pub mod feedback;
pub mod fsm;
pub mod profile;
pub mod safety;
pub mod sensors;
