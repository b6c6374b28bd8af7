use std::sync::{Mutex, PoisonError};

use crossbeam_channel::{Receiver, Sender};

use crate::status::Status;

/// Notification emitted by an experiment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExperimentEvent {
    /// Experiment status changed.
    StatusChanged(Status),
    /// Progress changed; the value is in `0..=360`.
    ProgressUpdated(u16),
    /// A trial was constructed.
    TrialCreated(u16),
    /// Trials were dropped and the experiment rearmed.
    Restarted,
}

/// Fan-out of events to every live subscriber.
#[derive(Debug, Default)]
pub(crate) struct Notifier {
    subscribers: Mutex<Vec<Sender<ExperimentEvent>>>,
}

impl Notifier {
    pub(crate) fn subscribe(&self) -> Receiver<ExperimentEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    /// Sends `events` in order; disconnected subscribers are dropped.
    pub(crate) fn emit(&self, events: impl IntoIterator<Item = ExperimentEvent>) {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for event in events {
            subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        }
    }

    /// Builds the event while holding the subscriber lock, so that
    /// concurrent emitters observe a consistent order.
    pub(crate) fn emit_with(&self, event: impl FnOnce() -> ExperimentEvent) {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let event = event();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}
