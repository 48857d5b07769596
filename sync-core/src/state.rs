//! States, events and actions of the sync protocol.
//!
//! The engine consumes [`Event`]s and produces [`Action`]s. Actions are
//! instructions, not side effects: sync-client interprets them and performs
//! the actual I/O (sending, timers, notifications).

use chrono::{DateTime, Utc};
use std::time::Duration;
use sync_types::{AgendaItem, Dictionary, PeerRequest, SourceId, TransactionId};

/// Protocol state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncState {
    /// Startup grace period; peer requests are ignored.
    WaitingInitialData,
    /// No transfer in progress.
    Idle,
    /// Init message sent, awaiting ack.
    InitSent,
    /// Single-message item sent, awaiting ack.
    SendingItem,
    /// First half of a split item sent, awaiting ack.
    SendingItemHalf1,
    /// Second half of a split item sent, awaiting ack.
    SendingItemHalf2,
    /// Done message sent, awaiting ack.
    SendingDone,
    /// No-new-data message sent, awaiting ack.
    NoChangeSent,
    /// A restart was requested mid-transfer; it runs on the next ack.
    RestartPending,
}

impl SyncState {
    /// Whether a message of a transfer is awaiting its ack.
    pub fn is_transferring(&self) -> bool {
        !matches!(self, Self::WaitingInitialData | Self::Idle)
    }
}

impl std::fmt::Display for SyncState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::WaitingInitialData => "waiting-initial-data",
            Self::Idle => "idle",
            Self::InitSent => "init-sent",
            Self::SendingItem => "sending-item",
            Self::SendingItemHalf1 => "sending-item-half-1",
            Self::SendingItemHalf2 => "sending-item-half-2",
            Self::SendingDone => "sending-done",
            Self::NoChangeSent => "no-change-sent",
            Self::RestartPending => "restart-pending",
        };
        f.write_str(name)
    }
}

/// Inputs to the engine. Each is handled atomically.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// The watch asked for data.
    PeerRequest(PeerRequest),
    /// The transport confirmed delivery.
    Ack {
        /// Transaction being acknowledged.
        transaction: TransactionId,
    },
    /// The transport reported a failed delivery.
    Nack {
        /// Transaction that failed.
        transaction: TransactionId,
    },
    /// A resend timer fired.
    ResendTimer {
        /// Generation the timer was armed for.
        generation: u64,
    },
    /// A source published its current list.
    Publish {
        /// Publishing source.
        source: SourceId,
        /// The complete list for that source.
        items: Vec<AgendaItem>,
        /// Vibrate when the resulting sync completes.
        vibrate: bool,
    },
    /// The startup window elapsed.
    InitialDataWindowElapsed {
        /// Window the timer was armed for.
        window: u64,
    },
    /// Send the full dataset regardless of what the watch holds.
    ForceSync,
    /// Prompt the watch to send a request.
    ForceRequest,
    /// Drop all source data and restart the startup window.
    Reset,
}

/// User-facing prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Notification {
    /// The watch needs a newer phone app.
    AppOutdated {
        /// Version the watch requires.
        required: u8,
    },
    /// The watch app is older than this engine supports.
    PeerOutdated {
        /// Version the watch reported.
        reported: u8,
    },
}

/// Observable engine status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    /// Last version reported by the watch, `-1` if none yet.
    pub peer_version: i32,
    /// When the last sync completed.
    pub last_sync: Option<DateTime<Utc>>,
}

impl Default for Status {
    fn default() -> Self {
        Self {
            peer_version: -1,
            last_sync: None,
        }
    }
}

/// Actions to be executed by sync-client.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Hand a message to the transport.
    Send {
        /// Transaction id to echo in ack/nack.
        transaction: TransactionId,
        /// The wire dictionary.
        message: Dictionary,
    },
    /// Arm a one-shot resend timer.
    ScheduleResend {
        /// Generation to report back in [`Event::ResendTimer`].
        generation: u64,
        /// Delay before firing.
        delay: Duration,
    },
    /// Arm the startup window timer.
    StartInitialDataTimer {
        /// Window to report back in [`Event::InitialDataWindowElapsed`].
        window: u64,
        /// Window length.
        delay: Duration,
    },
    /// Ask every source to publish fresh data.
    RefreshSources,
    /// Show a prompt to the user.
    Notify(Notification),
    /// Publish the current status to observers.
    EmitStatus(Status),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_active_states_are_transferring() {
        assert!(!SyncState::WaitingInitialData.is_transferring());
        assert!(!SyncState::Idle.is_transferring());
        for state in [
            SyncState::InitSent,
            SyncState::SendingItem,
            SyncState::SendingItemHalf1,
            SyncState::SendingItemHalf2,
            SyncState::SendingDone,
            SyncState::NoChangeSent,
            SyncState::RestartPending,
        ] {
            assert!(state.is_transferring(), "{state} should be transferring");
        }
    }

    #[test]
    fn default_status_has_unknown_peer() {
        let status = Status::default();
        assert_eq!(status.peer_version, -1);
        assert!(status.last_sync.is_none());
    }
}
