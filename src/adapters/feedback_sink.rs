//! Event sink that turns application events into feedback cues.

use log::warn;

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::error::SafetyFault;
use crate::feedback::{FeedbackQueue, Notification};
use crate::fsm::RunState;

/// Maps [`AppEvent`]s onto [`Notification`]s in a [`FeedbackQueue`].
pub struct FeedbackSink<'q> {
    queue: &'q FeedbackQueue,
    dropped: u32,
}

impl<'q> FeedbackSink<'q> {
    pub fn new(queue: &'q FeedbackQueue) -> Self {
        Self { queue, dropped: 0 }
    }

    /// Notifications lost to a full queue so far.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    fn notify(&mut self, n: Notification) {
        if !self.queue.push(n) {
            self.dropped = self.dropped.saturating_add(1);
            warn!("FEEDBACK: queue full, dropped {:?}", n);
        }
    }
}

fn cue_for(event: &AppEvent) -> Option<Notification> {
    match event {
        AppEvent::RunStarted { .. } => Some(Notification::RunStarted),
        AppEvent::PhaseStarted { index, .. } if *index > 0 => Some(Notification::PhaseChanged),
        AppEvent::StateChanged {
            to: RunState::Done, ..
        } => Some(Notification::RunComplete),
        AppEvent::StateChanged {
            to: RunState::Aborted,
            ..
        } => Some(Notification::Aborted),
        AppEvent::FaultDetected(mask) if mask & SafetyFault::OverTemperature.mask() != 0 => {
            Some(Notification::OverTemperature)
        }
        AppEvent::ThermocoupleFault(_) => Some(Notification::SensorFault),
        AppEvent::AutotuneFinished { .. } => Some(Notification::AutotuneDone),
        _ => None,
    }
}

impl EventSink for FeedbackSink<'_> {
    fn emit(&mut self, event: &AppEvent) {
        if let Some(n) = cue_for(event) {
            self.notify(n);
        }
    }
}
