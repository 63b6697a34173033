//! Port traits: the hexagonal boundary between the control core and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (thermocouple converters, SSRs, fans, profile storage,
//! process log, event sinks) implement these traits.  The
//! [`AppService`](super::service::AppService) consumes them via generics,
//! so the control core never touches hardware directly.
//!
//! - **ConfigPort** and **ProfileStore** implementations MUST validate
//!   before persisting.
//! - All port errors are typed; callers handle every variant explicitly.

use crate::config::ControllerConfig;
use crate::control::fan::FanId;
use crate::control::Zone;
use crate::error::{ProfileError, ThermocoupleError};
use crate::profile::Profile;
use crate::sensors::ChannelId;

use super::events::{AppEvent, LogRow};

// ───────────────────────────────────────────────────────────────
// Thermocouple port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Raw thermocouple reads, one channel at a time.
pub trait ThermocouplePort {
    /// Read a channel in °C, or the converter's error sentinel.
    fn read(&mut self, channel: ChannelId) -> Result<f32, ThermocoupleError>;
}

// ───────────────────────────────────────────────────────────────
// Output ports (driven adapters: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Heater SSR outputs.  Called once per zone every tick.
pub trait HeaterPort {
    fn set_heater(&mut self, zone: Zone, on: bool);
}

/// Heating-zone fans and the cooling airflow output.
pub trait FanPort {
    /// Set fan duty (0–100 %).
    fn set_fan(&mut self, fan: FanId, duty: u8);

    /// Switch the cooling airflow output.
    fn set_cooling(&mut self, on: bool);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (domain → logging / telemetry / feedback)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`]s through this port.
pub trait EventSink {
    fn emit(&mut self, event: &AppEvent);
}

impl<A: EventSink, B: EventSink> EventSink for (A, B) {
    fn emit(&mut self, event: &AppEvent) {
        self.0.emit(event);
        self.1.emit(event);
    }
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn emit(&mut self, event: &AppEvent) {
        (**self).emit(event);
    }
}

// ───────────────────────────────────────────────────────────────
// Process log port
// ───────────────────────────────────────────────────────────────

/// Receives one row per tick while a run or autotune is active.
pub trait ProcessLog {
    fn append_row(&mut self, row: &LogRow);
}

// ───────────────────────────────────────────────────────────────
// Profile store port
// ───────────────────────────────────────────────────────────────

/// Loads and persists the operator's profile.
pub trait ProfileStore {
    /// Load the stored profile.
    fn load(&self) -> Result<Profile, ProfileStoreError>;

    /// Validate and persist a profile.
    fn save(&self, profile: &Profile) -> Result<(), ProfileStoreError>;
}

// ───────────────────────────────────────────────────────────────
// Configuration port
// ───────────────────────────────────────────────────────────────

/// Loads and persists controller configuration.
///
/// Implementations MUST run [`validate_config`](crate::config::validate_config)
/// before persisting and reject invalid values with
/// [`ConfigError::ValidationFailed`] rather than clamping them.
pub trait ConfigPort {
    /// Load configuration.  Returns [`ControllerConfig::default()`] if none
    /// is stored.
    fn load(&self) -> Result<ControllerConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &ControllerConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (namespaced key-value blobs)
// ───────────────────────────────────────────────────────────────

/// Blob storage behind the profile and config stores (`"profile"` and
/// `"reflow"` namespaces).  A write replaces the whole blob.
pub trait StoragePort {
    /// Copy the blob into `buf`, truncating if `buf` is short.  Returns the
    /// bytes copied.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Missing keys are not an error.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    fn exists(&self, namespace: &str, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Stored blob is not a valid postcard `ControllerConfig`.
    Corrupted,
    /// Names the offending field.
    ValidationFailed(&'static str),
    StorageFull,
    IoError,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    NotFound,
    Full,
    IoError,
}

/// Errors from [`ProfileStore`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileStoreError {
    /// Nothing stored yet.
    NotFound,
    /// Stored blob failed deserialization.
    Corrupted,
    /// Rejected by [`Profile::validate`].
    Invalid(ProfileError),
    /// Backend failure.
    Storage(StorageError),
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for ProfileStoreError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "no stored profile"),
            Self::Corrupted => write!(f, "stored profile corrupted"),
            Self::Invalid(e) => write!(f, "invalid profile: {}", e),
            Self::Storage(e) => write!(f, "storage: {}", e),
        }
    }
}

impl From<StorageError> for ProfileStoreError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound => Self::NotFound,
            other => Self::Storage(other),
        }
    }
}

impl From<ProfileError> for ProfileStoreError {
    fn from(e: ProfileError) -> Self {
        Self::Invalid(e)
    }
}

impl std::error::Error for ConfigError {}
impl std::error::Error for StorageError {}
impl std::error::Error for ProfileStoreError {}
