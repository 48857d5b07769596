//! Throttling for user-facing update prompts.

use chrono::{DateTime, Duration, Utc};

/// Allows at most one notification per interval.
///
/// Both prompt kinds share one limiter.
#[derive(Debug, Clone)]
pub struct NotificationLimiter {
    interval: Duration,
    last: Option<DateTime<Utc>>,
}

impl NotificationLimiter {
    /// Create a limiter with the given minimum spacing.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Returns `true` and records `now` if a notification may be shown.
    pub fn allow(&mut self, now: DateTime<Utc>) -> bool {
        match self.last {
            Some(last) if now - last < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}
