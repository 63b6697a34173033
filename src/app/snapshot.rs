//! Status snapshot and the cell that publishes it to concurrent readers.
//!
//! The tick is the single writer.  It builds a [`Snapshot`] at the end of
//! every tick and stores it in a [`SnapshotCell`]; readers on other
//! threads (status printer, network front-end) copy out the latest one
//! and so only ever see tick-boundary state.
//!
//! The serialised form is the station's status contract:
//!
//! ```json
//! { "state": "RUNNING", "phase": "Soak", "phaseIndex": 1, "remain": 42,
//!   "top": 188.2, "bottom": 187.9, "ir": 185.0, "external": 150.3,
//!   "connected": [true, true, true, true],
//!   "outTop": 35.0, "outBottom": 28.4, "outIR": 22.1,
//!   "heaters": [true, false, false], "fanTop": 40, "fanBottom": 40,
//!   "cooling": false, "autotune": false, "faults": 0 }
//! ```

use core::cell::RefCell;

use embassy_sync::blocking_mutex::CriticalSectionMutex;
use heapless::String;
use serde::{Deserialize, Serialize};

use crate::control::ZONE_COUNT;
use crate::fsm::RunState;
use crate::profile::PHASE_NAME_LEN;
use crate::sensors::{ChannelId, CHANNEL_COUNT};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub state: RunState,
    /// Current phase name; empty when no profile is running.
    pub phase: String<PHASE_NAME_LEN>,
    #[serde(rename = "phaseIndex")]
    pub phase_index: Option<u8>,
    /// Whole seconds left in the current phase.
    pub remain: u32,
    pub top: f32,
    pub bottom: f32,
    pub ir: f32,
    pub external: f32,
    pub connected: [bool; CHANNEL_COUNT],
    #[serde(rename = "outTop")]
    pub out_top: f32,
    #[serde(rename = "outBottom")]
    pub out_bottom: f32,
    #[serde(rename = "outIR")]
    pub out_ir: f32,
    /// SSR levels applied this tick: top, bottom, IR.
    pub heaters: [bool; ZONE_COUNT],
    #[serde(rename = "fanTop")]
    pub fan_top: u8,
    #[serde(rename = "fanBottom")]
    pub fan_bottom: u8,
    pub cooling: bool,
    pub autotune: bool,
    pub faults: u8,
}

impl Snapshot {
    /// Filtered temperature of one channel.
    pub fn temperature(&self, channel: ChannelId) -> f32 {
        match channel {
            ChannelId::Top => self.top,
            ChannelId::Bottom => self.bottom,
            ChannelId::Ir => self.ir,
            ChannelId::External => self.external,
        }
    }

    pub fn outputs(&self) -> [f32; ZONE_COUNT] {
        [self.out_top, self.out_bottom, self.out_ir]
    }

    pub fn to_json(&self) -> serde_json::Result<std::string::String> {
        serde_json::to_string(self)
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            state: RunState::Idle,
            phase: String::new(),
            phase_index: None,
            remain: 0,
            top: 0.0,
            bottom: 0.0,
            ir: 0.0,
            external: 0.0,
            connected: [true; CHANNEL_COUNT],
            out_top: 0.0,
            out_bottom: 0.0,
            out_ir: 0.0,
            heaters: [false; ZONE_COUNT],
            fan_top: 0,
            fan_bottom: 0,
            cooling: false,
            autotune: false,
            faults: 0,
        }
    }
}

/// Latest published [`Snapshot`], shareable across threads.
pub struct SnapshotCell {
    inner: CriticalSectionMutex<RefCell<Snapshot>>,
}

impl SnapshotCell {
    pub fn new() -> Self {
        Self {
            inner: CriticalSectionMutex::new(RefCell::new(Snapshot::default())),
        }
    }

    /// Replace the published snapshot.
    pub fn publish(&self, snapshot: Snapshot) {
        self.inner.lock(|cell| *cell.borrow_mut() = snapshot);
    }

    /// Copy out the latest snapshot.
    pub fn latest(&self) -> Snapshot {
        self.inner.lock(|cell| cell.borrow().clone())
    }
}

impl Default for SnapshotCell {
    fn default() -> Self {
        Self::new()
    }
}
