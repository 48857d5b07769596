//! Sync id tracking.
//!
//! A sync id names one dataset delivered to the watch. Ids live in `1..=255`;
//! `0` means "unknown" and is skipped on wraparound. The tracker remembers
//! the id being sent, the last id that completed, and the last id the peer
//! reported holding.

use sync_types::SyncId;

/// Tracks the current, last successful and peer-reported sync ids.
#[derive(Debug, Clone, Default)]
pub struct SyncIdTracker {
    current: SyncId,
    last_successful: SyncId,
    peer_reported: SyncId,
}

impl SyncIdTracker {
    /// Create a tracker that has never assigned an id.
    pub fn new() -> Self {
        Self::default()
    }

    /// The id most recently assigned (or adopted).
    pub fn current(&self) -> SyncId {
        self.current
    }

    /// The id of the last dataset the peer acknowledged completely.
    pub fn last_successful(&self) -> SyncId {
        self.last_successful
    }

    /// The id the peer reported in its latest request.
    pub fn peer_reported(&self) -> SyncId {
        self.peer_reported
    }

    /// Record the id reported by a peer request.
    ///
    /// If no id has been assigned yet, the reported id is adopted so the
    /// sequence continues from what the watch already holds.
    pub fn record_peer(&mut self, reported: SyncId) {
        self.peer_reported = reported;
        if self.current.is_unknown() {
            self.current = reported;
        }
    }

    /// Assign the next id for a new dataset.
    pub fn advance(&mut self) -> SyncId {
        self.current = self.current.next();
        self.current
    }

    /// The dataset with the current id was delivered.
    pub fn mark_success(&mut self) {
        self.last_successful = self.current;
    }
}
