//! Outbound application events and process-log rows.
//!
//! The [`AppService`](super::service::AppService) emits [`AppEvent`]s
//! through the [`EventSink`](super::ports::EventSink) port and hands one
//! [`LogRow`] per active tick to the [`ProcessLog`](super::ports::ProcessLog).

use heapless::String;

use super::snapshot::Snapshot;
use crate::control::autotune::AutotuneReport;
use crate::control::{Zone, ZONE_COUNT};
use crate::fsm::RunState;
use crate::profile::{PhaseKind, PHASE_NAME_LEN, PROFILE_NAME_LEN};
use crate::sensors::{ChannelId, CHANNEL_COUNT};

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The service is up (carries initial state).
    Started(RunState),

    /// A profile run was accepted.
    RunStarted {
        profile: String<PROFILE_NAME_LEN>,
        phases: usize,
    },

    /// The scheduler moved between run states.
    StateChanged { from: RunState, to: RunState },

    /// A profile phase was entered.
    PhaseStarted {
        index: usize,
        name: String<PHASE_NAME_LEN>,
        kind: PhaseKind,
        target_c: f32,
    },

    /// New safety fault bits were raised (carries the full mask).
    FaultDetected(u8),

    /// Every safety fault has cleared.
    FaultCleared,

    /// A channel exceeded its fault threshold and is holding its last value.
    ThermocoupleFault(ChannelId),

    /// A disconnected channel produced a plausible reading again.
    ThermocoupleRestored(ChannelId),

    /// An autotune run finished; its gains are now live on `zone`.
    AutotuneFinished { zone: Zone, report: AutotuneReport },

    /// Periodic status snapshot.
    Telemetry(Snapshot),
}

/// One process-log record.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRow {
    pub timestamp_ms: u64,
    pub phase: String<PHASE_NAME_LEN>,
    /// Filtered temperatures: top, bottom, IR, external.
    pub temps: [f32; CHANNEL_COUNT],
    /// Zone outputs in percent: top, bottom, IR.
    pub outputs: [f32; ZONE_COUNT],
    pub autotune: bool,
}
