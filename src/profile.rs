//! Reflow profile data: an ordered list of phases plus the over-temperature
//! limit that guards the whole run.
//!
//! Profiles are plain data.  The scheduler takes its own copy on `start()`
//! so the profile cannot change under a running process.  The serialised
//! form is the station's preset contract:
//!
//! ```json
//! { "name": "Lead-Free BGA", "overLimitC": 280.0,
//!   "phases": [ { "name": "Preheat", "kind": "heat", "targetC": 165.0,
//!                 "seconds": 90, "Kp": 2.0, "Ki": 0.08, "Kd": 0.0,
//!                 "zones": { "top": true, "bottom": true, "ir": true },
//!                 "fans": { "top": 40, "bottom": 40 },
//!                 "coolingRate": 2.0 } ] }
//! ```
//!
//! On import a phase may carry the flat `"useTop"`, `"useBottom"` and
//! `"useIR"` flags instead of `"zones"` (presets saved by the desktop
//! client); `"zones"` wins when both are present and a missing flag
//! means enabled.  Names longer than 32 (profile) or 24 (phase) bytes are
//! cut at a character boundary rather than rejected.

use heapless::{String, Vec};
use serde::{Deserialize, Deserializer, Serialize};

use crate::control::fan::FanSpeeds;
use crate::control::pid::PidGains;
use crate::control::{Zone, ZONE_COUNT};
use crate::error::ProfileError;

/// Maximum number of phases in one profile.
pub const MAX_PHASES: usize = 10;
/// Maximum profile name length (bytes).
pub const PROFILE_NAME_LEN: usize = 32;
/// Maximum phase name length (bytes).
pub const PHASE_NAME_LEN: usize = 24;

/// What happens to the heaters while the phase runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseKind {
    /// Enabled zones regulate towards the target.
    #[default]
    Heat,
    /// Heaters off, cooling airflow on.
    Cool,
}

/// Which heating zones take part in a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneEnable {
    pub top: bool,
    pub bottom: bool,
    pub ir: bool,
}

impl ZoneEnable {
    pub const ALL: Self = Self {
        top: true,
        bottom: true,
        ir: true,
    };
    pub const NONE: Self = Self {
        top: false,
        bottom: false,
        ir: false,
    };

    pub fn get(&self, zone: Zone) -> bool {
        match zone {
            Zone::Top => self.top,
            Zone::Bottom => self.bottom,
            Zone::Ir => self.ir,
        }
    }

    pub fn as_array(&self) -> [bool; ZONE_COUNT] {
        [self.top, self.bottom, self.ir]
    }
}

impl Default for ZoneEnable {
    fn default() -> Self {
        Self::ALL
    }
}

fn default_cooling_rate() -> f32 {
    2.0
}

fn default_fans() -> FanSpeeds {
    FanSpeeds::both(0)
}

/// One step of a profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Phase {
    pub name: String<PHASE_NAME_LEN>,
    pub kind: PhaseKind,
    #[serde(rename = "targetC")]
    pub target_c: f32,
    #[serde(rename = "seconds")]
    pub duration_secs: u32,
    #[serde(rename = "Kp")]
    pub kp: f32,
    #[serde(rename = "Ki")]
    pub ki: f32,
    #[serde(rename = "Kd")]
    pub kd: f32,
    pub zones: ZoneEnable,
    /// Fan duty per fan; 0 means "idle airflow".
    pub fans: FanSpeeds,
    /// Cooling-rate intent (°C/s) used to pick the fan tier in Cool phases.
    #[serde(rename = "coolingRate")]
    pub cooling_rate: f32,
}

impl Phase {
    /// A heating phase with every zone enabled and default gains.
    pub fn heat(name: &str, target_c: f32, duration_secs: u32) -> Self {
        let gains = PidGains::default();
        Self {
            name: bounded(name),
            kind: PhaseKind::Heat,
            target_c,
            duration_secs,
            kp: gains.kp,
            ki: gains.ki,
            kd: gains.kd,
            zones: ZoneEnable::ALL,
            fans: default_fans(),
            cooling_rate: default_cooling_rate(),
        }
    }

    /// A cooling phase: no zones, heaters forced off.
    pub fn cool(name: &str, target_c: f32, duration_secs: u32, cooling_rate: f32) -> Self {
        Self {
            kind: PhaseKind::Cool,
            zones: ZoneEnable::NONE,
            cooling_rate,
            ..Self::heat(name, target_c, duration_secs)
        }
    }

    pub fn with_gains(mut self, gains: PidGains) -> Self {
        self.kp = gains.kp;
        self.ki = gains.ki;
        self.kd = gains.kd;
        self
    }

    pub fn with_zones(mut self, zones: ZoneEnable) -> Self {
        self.zones = zones;
        self
    }

    pub fn with_fans(mut self, fans: FanSpeeds) -> Self {
        self.fans = fans;
        self
    }

    pub fn gains(&self) -> PidGains {
        PidGains::new(self.kp, self.ki, self.kd)
    }

    pub fn duration_ms(&self) -> u64 {
        u64::from(self.duration_secs) * 1000
    }

    pub fn is_cool(&self) -> bool {
        self.kind == PhaseKind::Cool
    }
}

// ── Phase deserialisation ─────────────────────────────────────

/// Preset JSON form of a [`Phase`]: defaults, truncation and the flat
/// zone flags.
#[derive(Deserialize)]
struct PresetPhase {
    #[serde(deserialize_with = "truncating")]
    name: String<PHASE_NAME_LEN>,
    #[serde(default)]
    kind: PhaseKind,
    #[serde(rename = "targetC")]
    target_c: f32,
    #[serde(rename = "seconds")]
    duration_secs: u32,
    #[serde(rename = "Kp")]
    kp: f32,
    #[serde(rename = "Ki")]
    ki: f32,
    #[serde(rename = "Kd", default)]
    kd: f32,
    zones: Option<ZoneEnable>,
    #[serde(rename = "useTop")]
    use_top: Option<bool>,
    #[serde(rename = "useBottom")]
    use_bottom: Option<bool>,
    #[serde(rename = "useIR")]
    use_ir: Option<bool>,
    #[serde(default = "default_fans")]
    fans: FanSpeeds,
    #[serde(rename = "coolingRate", default = "default_cooling_rate")]
    cooling_rate: f32,
}

impl From<PresetPhase> for Phase {
    fn from(p: PresetPhase) -> Self {
        let zones = p.zones.unwrap_or(ZoneEnable {
            top: p.use_top.unwrap_or(true),
            bottom: p.use_bottom.unwrap_or(true),
            ir: p.use_ir.unwrap_or(true),
        });
        Self {
            name: p.name,
            kind: p.kind,
            target_c: p.target_c,
            duration_secs: p.duration_secs,
            kp: p.kp,
            ki: p.ki,
            kd: p.kd,
            zones,
            fans: p.fans,
            cooling_rate: p.cooling_rate,
        }
    }
}

/// Positional form for binary formats (postcard blobs); field order
/// matches [`Phase`]'s `Serialize`.
#[derive(Deserialize)]
struct PhaseRecord {
    name: String<PHASE_NAME_LEN>,
    kind: PhaseKind,
    target_c: f32,
    duration_secs: u32,
    kp: f32,
    ki: f32,
    kd: f32,
    zones: ZoneEnable,
    fans: FanSpeeds,
    cooling_rate: f32,
}

impl From<PhaseRecord> for Phase {
    fn from(r: PhaseRecord) -> Self {
        Self {
            name: r.name,
            kind: r.kind,
            target_c: r.target_c,
            duration_secs: r.duration_secs,
            kp: r.kp,
            ki: r.ki,
            kd: r.kd,
            zones: r.zones,
            fans: r.fans,
            cooling_rate: r.cooling_rate,
        }
    }
}

impl<'de> Deserialize<'de> for Phase {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            PresetPhase::deserialize(deserializer).map(Self::from)
        } else {
            PhaseRecord::deserialize(deserializer).map(Self::from)
        }
    }
}

fn truncating<'de, D, const N: usize>(deserializer: D) -> Result<String<N>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = std::string::String::deserialize(deserializer)?;
    Ok(bounded(&s))
}

/// A complete reflow profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(deserialize_with = "truncating")]
    pub name: String<PROFILE_NAME_LEN>,
    #[serde(rename = "overLimitC")]
    pub over_temp_limit_c: f32,
    pub phases: Vec<Phase, MAX_PHASES>,
}

impl Profile {
    /// An empty profile (not runnable until phases are added).
    pub fn new(name: &str, over_temp_limit_c: f32) -> Self {
        Self {
            name: bounded(name),
            over_temp_limit_c,
            phases: Vec::new(),
        }
    }

    /// Append a phase.
    pub fn push_phase(&mut self, phase: Phase) -> Result<(), ProfileError> {
        self.phases
            .push(phase)
            .map_err(|_| ProfileError::TooManyPhases)
    }

    /// Builder form of [`push_phase`](Self::push_phase).
    pub fn with_phase(mut self, phase: Phase) -> Result<Self, ProfileError> {
        self.push_phase(phase)?;
        Ok(self)
    }

    /// Check the profile can be run.
    pub fn validate(&self) -> Result<(), ProfileError> {
        if self.phases.is_empty() {
            return Err(ProfileError::NoPhases);
        }
        if !(self.over_temp_limit_c.is_finite() && self.over_temp_limit_c > 0.0) {
            return Err(ProfileError::BadOverTempLimit);
        }
        for (i, phase) in self.phases.iter().enumerate() {
            if phase.duration_secs == 0 {
                return Err(ProfileError::ZeroDuration { phase: i });
            }
            if !(phase.target_c.is_finite() && phase.target_c < self.over_temp_limit_c) {
                return Err(ProfileError::TargetOutOfRange { phase: i });
            }
        }
        Ok(())
    }

    /// Sum of all phase durations.
    pub fn total_duration_secs(&self) -> u64 {
        self.phases.iter().map(|p| u64::from(p.duration_secs)).sum()
    }

    pub fn from_json(json: &[u8]) -> Result<Self, ProfileError> {
        serde_json::from_slice(json).map_err(|_| ProfileError::Malformed)
    }

    pub fn to_json(&self) -> Result<std::string::String, ProfileError> {
        serde_json::to_string(self).map_err(|_| ProfileError::Malformed)
    }

    /// The station's stock lead-free BGA profile.
    pub fn lead_free_bga() -> Self {
        let phases = [
            Phase::heat("Preheat", 165.0, 90)
                .with_gains(PidGains::new(2.0, 0.08, 0.0))
                .with_fans(FanSpeeds::both(40)),
            Phase::heat("Soak", 190.0, 60)
                .with_gains(PidGains::new(2.1, 0.09, 0.0))
                .with_fans(FanSpeeds::both(40)),
            Phase::heat("Reflow", 255.0, 30)
                .with_gains(PidGains::new(2.5, 0.10, 0.0))
                .with_zones(ZoneEnable {
                    top: true,
                    bottom: false,
                    ir: false,
                })
                .with_fans(FanSpeeds { top: 60, bottom: 30 }),
            Phase::cool("Cool", 100.0, 90, 3.0)
                .with_gains(PidGains::new(1.0, 0.05, 0.0))
                .with_fans(FanSpeeds::both(80)),
        ];
        let mut profile = Self::new("Lead-Free BGA", 280.0);
        profile.phases = phases.into_iter().collect();
        profile
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self::lead_free_bga()
    }
}

/// Copy `s` into a fixed-capacity string, dropping whatever does not fit.
pub(crate) fn bounded<const N: usize>(s: &str) -> String<N> {
    let mut out = String::new();
    for ch in s.chars() {
        if out.push(ch).is_err() {
            break;
        }
    }
    out
}
