//! Recording notifier for tests
//!
//! Captures every published event in memory. Can be switched to fail each
//! delivery to exercise the best-effort path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use uuid::Uuid;

use super::{FormationEvent, NotificationError, Notifier};

#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    events: Arc<Mutex<Vec<FormationEvent>>>,
    failing: Arc<AtomicBool>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier whose every delivery fails
    pub fn failing() -> Self {
        let notifier = Self::default();
        notifier.failing.store(true, Ordering::SeqCst);
        notifier
    }

    /// All events delivered so far, in publish order
    pub fn events(&self) -> Vec<FormationEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Events addressed to one participant
    pub fn events_for(&self, participant_id: Uuid) -> Vec<FormationEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.recipients().contains(&participant_id))
            .collect()
    }

    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, event: &FormationEvent) -> Result<(), NotificationError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotificationError::Delivery(format!(
                "{} rejected by recording notifier",
                event.name()
            )));
        }
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
        Ok(())
    }
}
