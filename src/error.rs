//! Unified error types for the reflow station core.
//!
//! A single `Error` enum that every rejected operation funnels into,
//! keeping the caller's error handling uniform.  All variants are `Copy`
//! so they can be passed through the supervisor, FSM and event sink
//! without allocation.

use core::fmt;

use crate::fsm::RunState;
use crate::sensors::ChannelId;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible core operation funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The profile cannot be used for a run.
    InvalidProfile(ProfileError),
    /// The command is not valid in the current run state.
    InvalidCommand(CommandError),
    /// A thermocouple reader reported a sentinel error.
    Thermocouple(ThermocoupleError),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidProfile(e) => write!(f, "invalid profile: {e}"),
            Self::InvalidCommand(e) => write!(f, "invalid command: {e}"),
            Self::Thermocouple(e) => write!(f, "thermocouple: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Profile errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileError {
    /// The profile has no phases.
    NoPhases,
    /// A phase has a zero duration.
    ZeroDuration { phase: usize },
    /// A phase target is not finite or is at/above the over-temperature limit.
    TargetOutOfRange { phase: usize },
    /// The over-temperature limit is not a finite positive value.
    BadOverTempLimit,
    /// More phases than the fixed capacity.
    TooManyPhases,
    /// The serialised form could not be decoded.
    Malformed,
}

impl fmt::Display for ProfileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoPhases => write!(f, "profile has no phases"),
            Self::ZeroDuration { phase } => write!(f, "phase {phase} has zero duration"),
            Self::TargetOutOfRange { phase } => {
                write!(f, "phase {phase} target is outside the safe range")
            }
            Self::BadOverTempLimit => write!(f, "over-temperature limit must be positive"),
            Self::TooManyPhases => write!(f, "too many phases"),
            Self::Malformed => write!(f, "malformed profile data"),
        }
    }
}

impl From<ProfileError> for Error {
    fn from(e: ProfileError) -> Self {
        Self::InvalidProfile(e)
    }
}

// ---------------------------------------------------------------------------
// Command errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// The command requires `Idle` but the controller is elsewhere.
    NotIdle(RunState),
    /// `reset` while a run or autotune is still in progress.
    RunInProgress(RunState),
    /// Autotune target is not a plausible temperature.
    BadAutotuneTarget,
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotIdle(state) => write!(f, "controller is {state:?}, not Idle"),
            Self::RunInProgress(state) => write!(f, "cannot reset while {state:?}"),
            Self::BadAutotuneTarget => write!(f, "autotune target out of range"),
        }
    }
}

impl From<CommandError> for Error {
    fn from(e: CommandError) -> Self {
        Self::InvalidCommand(e)
    }
}

// ---------------------------------------------------------------------------
// Thermocouple reader errors
// ---------------------------------------------------------------------------

/// Sentinel errors a [`ThermocouplePort`](crate::app::ports::ThermocouplePort)
/// may return instead of a temperature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThermocoupleError {
    /// Converter reports an open thermocouple input.
    OpenCircuit,
    /// Thermocouple shorted to ground or supply.
    ShortCircuit,
    /// The bus transfer to the converter failed.
    BusError,
}

impl fmt::Display for ThermocoupleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenCircuit => write!(f, "open circuit"),
            Self::ShortCircuit => write!(f, "short circuit"),
            Self::BusError => write!(f, "bus error"),
        }
    }
}

impl From<ThermocoupleError> for Error {
    fn from(e: ThermocoupleError) -> Self {
        Self::Thermocouple(e)
    }
}

// ---------------------------------------------------------------------------
// Safety faults
// ---------------------------------------------------------------------------

/// Faults tracked by the safety supervisor as a bitmask.
///
/// Only `OverTemperature` is fatal to a run.  The per-channel
/// thermocouple bits are advisory: the channel holds its last good value
/// and the run continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SafetyFault {
    /// Any channel at or above the profile limit.
    OverTemperature = 0b0000_0001,
    ThermocoupleTop = 0b0000_0010,
    ThermocoupleBottom = 0b0000_0100,
    ThermocoupleIr = 0b0000_1000,
    ThermocoupleExternal = 0b0001_0000,
}

impl SafetyFault {
    /// Return the bitmask for this fault.
    pub const fn mask(self) -> u8 {
        self as u8
    }

    /// The advisory fault bit for a disconnected channel.
    pub const fn thermocouple(channel: ChannelId) -> Self {
        match channel {
            ChannelId::Top => Self::ThermocoupleTop,
            ChannelId::Bottom => Self::ThermocoupleBottom,
            ChannelId::Ir => Self::ThermocoupleIr,
            ChannelId::External => Self::ThermocoupleExternal,
        }
    }
}

impl fmt::Display for SafetyFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OverTemperature => write!(f, "over temperature"),
            Self::ThermocoupleTop => write!(f, "top thermocouple fault"),
            Self::ThermocoupleBottom => write!(f, "bottom thermocouple fault"),
            Self::ThermocoupleIr => write!(f, "IR table thermocouple fault"),
            Self::ThermocoupleExternal => write!(f, "external thermocouple fault"),
        }
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
