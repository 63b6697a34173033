//! Inbound commands to the application service.
//!
//! These represent actions requested by the outside world (front panel,
//! serial console, network front-end) that the
//! [`AppService`](super::service::AppService) interprets and acts upon.

use crate::control::Zone;
use crate::profile::Profile;

/// Commands that external adapters can send into the control core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    /// Run a profile from its first phase.
    Start(Profile),

    /// Stop a run or autotune immediately, heaters off.
    Abort,

    /// Acknowledge a finished or aborted run and return to Idle.
    Reset,

    /// Autotune one zone towards `target_c`.
    StartAutotune { zone: Zone, target_c: f32 },
}
