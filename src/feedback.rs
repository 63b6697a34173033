//! Audible / visual feedback queue.
//!
//! The control tick never drives a buzzer or LED itself.  It drops a
//! [`Notification`] into a bounded queue and moves on; an output-device
//! task drains the queue at its own pace.
//!
//! ```text
//! ┌─────────────┐  try_send  ┌────────────────┐  try_receive  ┌─────────────┐
//! │ control tick│──────────▶ │ FeedbackQueue  │ ────────────▶ │ buzzer / LED│
//! │ (producer)  │  (drops    │ (bounded MPMC) │               │ (consumer)  │
//! └─────────────┘  if full)  └────────────────┘               └─────────────┘
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

/// Maximum number of pending notifications.
pub const FEEDBACK_DEPTH: usize = 8;

/// Operator-facing cues, ordered by rough priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Notification {
    // ── Safety ─────────────────────────────────────────────
    OverTemperature = 0,
    SensorFault = 1,

    // ── Process ────────────────────────────────────────────
    RunStarted = 10,
    PhaseChanged = 11,
    RunComplete = 12,
    Aborted = 13,
    AutotuneDone = 14,
}

/// Bounded notification queue shared between the tick and the output
/// device.  Can live in a `static`.
pub struct FeedbackQueue {
    channel: Channel<CriticalSectionRawMutex, Notification, FEEDBACK_DEPTH>,
}

impl FeedbackQueue {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
        }
    }

    /// Enqueue without blocking.  Returns `false` if the queue is full
    /// and the notification was dropped.
    pub fn push(&self, notification: Notification) -> bool {
        self.channel.try_send(notification).is_ok()
    }

    /// Next pending notification, if any.
    pub fn pop(&self) -> Option<Notification> {
        self.channel.try_receive().ok()
    }

    /// Drain every pending notification in FIFO order.
    pub fn drain(&self, mut handler: impl FnMut(Notification)) {
        while let Some(n) = self.pop() {
            handler(n);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }

    pub fn len(&self) -> usize {
        self.channel.len()
    }
}

impl Default for FeedbackQueue {
    fn default() -> Self {
        Self::new()
    }
}
