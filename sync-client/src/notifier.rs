//! User-facing prompts.

use std::sync::{Arc, Mutex, PoisonError};
use sync_core::Notification;

/// Shows update prompts to the user.
pub trait Notifier: Send + Sync + 'static {
    /// Present a notification. Rate limiting has already been applied.
    fn notify(&self, notification: Notification);
}

/// Logs notifications instead of showing them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) {
        match notification {
            Notification::AppOutdated { required } => {
                tracing::warn!(required, "watch requires a newer phone app, please update");
            }
            Notification::PeerOutdated { reported } => {
                tracing::warn!(reported, "watch app is outdated, please update it");
            }
        }
    }
}

/// Keeps every notification in memory.
#[derive(Debug, Default, Clone)]
pub struct RecordingNotifier {
    seen: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifications shown so far.
    pub fn seen(&self) -> Vec<Notification> {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_notifier_shares_state() {
        let notifier = RecordingNotifier::new();
        let clone = notifier.clone();
        clone.notify(Notification::PeerOutdated { reported: 3 });
        assert_eq!(
            notifier.seen(),
            vec![Notification::PeerOutdated { reported: 3 }]
        );
    }
}
