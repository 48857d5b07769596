//! The sync protocol state machine.
//!
//! [`SyncEngine`] owns all protocol state and is driven one [`Event`] at a
//! time. It performs no I/O: every send, timer and notification is returned
//! as an [`Action`] for the runtime to execute. Callers must serialize
//! events; the engine assumes it is never re-entered.

use chrono::{DateTime, Utc};
use sync_types::{
    fits_single_message, AgendaItem, DisplaySettings, ItemPayload, Message, PeerRequest, SyncId,
    TransactionId, VibratePattern,
};

use crate::inflight::{InFlight, RetryDecision};
use crate::{
    build_sync_list, Action, EngineConfig, Event, Notification, NotificationLimiter,
    PerSourceStore, Status, SyncIdTracker, SyncState,
};

/// The protocol engine.
#[derive(Debug, Clone)]
pub struct SyncEngine {
    config: EngineConfig,
    settings: DisplaySettings,
    state: SyncState,
    store: PerSourceStore,
    ids: SyncIdTracker,
    in_flight: InFlight,
    items_to_send: Vec<AgendaItem>,
    current_index: usize,
    last_successful_items: Option<Vec<AgendaItem>>,
    vibrate_on_completion: bool,
    force_full_sync: bool,
    peer_version: Option<u8>,
    last_sync: Option<DateTime<Utc>>,
    notifications: NotificationLimiter,
    window: u64,
}

impl SyncEngine {
    /// Create an engine in the startup grace period.
    ///
    /// Call [`SyncEngine::start`] to obtain the startup actions.
    pub fn new(config: EngineConfig, settings: DisplaySettings) -> Self {
        Self {
            in_flight: InFlight::new(config.max_retries),
            notifications: NotificationLimiter::new(config.notification_interval()),
            config,
            settings,
            state: SyncState::WaitingInitialData,
            store: PerSourceStore::new(),
            ids: SyncIdTracker::new(),
            items_to_send: Vec::new(),
            current_index: 0,
            last_successful_items: None,
            vibrate_on_completion: false,
            force_full_sync: false,
            peer_version: None,
            last_sync: None,
            window: 0,
        }
    }

    /// Begin the startup data-gather window.
    pub fn start(&mut self) -> Vec<Action> {
        self.state = SyncState::WaitingInitialData;
        self.window = self.window.wrapping_add(1);
        vec![
            Action::RefreshSources,
            Action::StartInitialDataTimer {
                window: self.window,
                delay: self.config.initial_data_wait(),
            },
        ]
    }

    /// Current protocol state.
    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Current observable status.
    pub fn status(&self) -> Status {
        Status {
            peer_version: self.peer_version.map_or(-1, i32::from),
            last_sync: self.last_sync,
        }
    }

    /// Sync id tracking.
    pub fn sync_ids(&self) -> &SyncIdTracker {
        &self.ids
    }

    /// Items prepared for the current (or last) transfer.
    pub fn items_to_send(&self) -> &[AgendaItem] {
        &self.items_to_send
    }

    /// Items of the last completed sync.
    pub fn last_successful_items(&self) -> Option<&[AgendaItem]> {
        self.last_successful_items.as_deref()
    }

    /// Transaction awaiting an ack.
    pub fn in_flight_transaction(&self) -> Option<TransactionId> {
        self.in_flight.current()
    }

    /// Whether the next completed sync will vibrate.
    pub fn vibrate_pending(&self) -> bool {
        self.vibrate_on_completion
    }

    /// Display settings used for encoding.
    pub fn settings(&self) -> &DisplaySettings {
        &self.settings
    }

    /// Published source data.
    pub fn store(&self) -> &PerSourceStore {
        &self.store
    }

    /// Process one event.
    pub fn handle(&mut self, event: Event, now: DateTime<Utc>) -> Vec<Action> {
        match event {
            Event::PeerRequest(request) => self.on_peer_request(request, now),
            Event::Ack { transaction } => self.on_ack(transaction, now),
            Event::Nack { transaction } => self.on_nack(transaction),
            Event::ResendTimer { generation } => self.on_resend_timer(generation),
            Event::Publish {
                source,
                items,
                vibrate,
            } => {
                if !self.store.publish(source.clone(), items) {
                    tracing::debug!(source = %source, "publish unchanged");
                    return Vec::new();
                }
                tracing::debug!(source = %source, "publish changed source data");
                if vibrate {
                    self.vibrate_on_completion = true;
                }
                self.request_sync(self.ids.peer_reported(), now)
            }
            Event::InitialDataWindowElapsed { window } => {
                if self.state != SyncState::WaitingInitialData || window != self.window {
                    tracing::debug!(window, "stale initial data timer");
                    return Vec::new();
                }
                tracing::debug!("initial data window elapsed");
                self.state = SyncState::Idle;
                vec![self.send(Message::ForceRequest)]
            }
            Event::ForceSync => {
                if self.state == SyncState::WaitingInitialData {
                    tracing::debug!("force sync ignored during startup window");
                    return Vec::new();
                }
                self.force_full_sync = true;
                self.request_sync(SyncId::UNKNOWN, now)
            }
            Event::ForceRequest => {
                if self.state.is_transferring() {
                    tracing::debug!(state = %self.state, "force request skipped during transfer");
                    return Vec::new();
                }
                vec![self.send(Message::ForceRequest)]
            }
            Event::Reset => {
                tracing::info!("full reset");
                self.store.clear();
                self.in_flight.clear();
                self.items_to_send.clear();
                self.current_index = 0;
                self.force_full_sync = false;
                self.start()
            }
        }
    }

    fn on_peer_request(&mut self, request: PeerRequest, now: DateTime<Utc>) -> Vec<Action> {
        if self.state == SyncState::WaitingInitialData {
            tracing::debug!("peer request during startup window ignored");
            return Vec::new();
        }

        self.peer_version = Some(request.version);
        self.ids.record_peer(request.last_sync_id);

        let mut actions = if request.min_version > self.config.bundled_version {
            tracing::warn!(
                required = request.min_version,
                bundled = self.config.bundled_version,
                "watch requires a newer phone app"
            );
            self.withhold(
                Notification::AppOutdated {
                    required: request.min_version,
                },
                now,
            )
        } else if request.version < self.config.min_supported_version {
            tracing::warn!(
                reported = request.version,
                minimum = self.config.min_supported_version,
                "watch app is outdated"
            );
            self.withhold(
                Notification::PeerOutdated {
                    reported: request.version,
                },
                now,
            )
        } else {
            self.request_sync(request.last_sync_id, now)
        };

        actions.push(Action::EmitStatus(self.status()));
        actions
    }

    /// Abort any transfer and maybe prompt the user.
    fn withhold(&mut self, notification: Notification, now: DateTime<Utc>) -> Vec<Action> {
        self.settle();
        if self.notifications.allow(now) {
            vec![Action::Notify(notification)]
        } else {
            Vec::new()
        }
    }

    /// Start a sync now, or defer it until the in-flight message is acked.
    fn request_sync(&mut self, reported: SyncId, now: DateTime<Utc>) -> Vec<Action> {
        match self.state {
            SyncState::WaitingInitialData => Vec::new(),
            SyncState::Idle => self.begin_sync(reported, now),
            _ => {
                tracing::debug!(state = %self.state, "restart deferred until next ack");
                self.state = SyncState::RestartPending;
                Vec::new()
            }
        }
    }

    fn begin_sync(&mut self, reported: SyncId, now: DateTime<Utc>) -> Vec<Action> {
        if self.state == SyncState::WaitingInitialData {
            return Vec::new();
        }
        let reported = if std::mem::take(&mut self.force_full_sync) {
            SyncId::UNKNOWN
        } else {
            reported
        };

        self.items_to_send =
            build_sync_list(&self.store, now, self.config.effective_max_items());
        self.current_index = 0;

        let last_successful = self.ids.last_successful();
        let unchanged = !last_successful.is_unknown()
            && last_successful == reported
            && self.last_successful_items.as_ref() == Some(&self.items_to_send);

        if unchanged {
            tracing::debug!(sync_id = %reported, "watch already holds current data");
            self.state = SyncState::NoChangeSent;
            return vec![self.send(Message::NoNewData)];
        }

        let sync_id = self.ids.advance();
        tracing::debug!(
            sync_id = %sync_id,
            items = self.items_to_send.len(),
            "beginning sync"
        );
        self.state = SyncState::InitSent;
        let item_count = u8::try_from(self.items_to_send.len()).unwrap_or(u8::MAX);
        vec![self.send(Message::Init {
            item_count,
            sync_id,
            min_version: self.config.min_supported_version,
            settings: self.settings.bitmask(),
        })]
    }

    fn on_ack(&mut self, transaction: TransactionId, now: DateTime<Utc>) -> Vec<Action> {
        if !self.in_flight.matches(transaction) {
            tracing::debug!(%transaction, "ignoring ack for unknown transaction");
            return Vec::new();
        }

        match self.state {
            SyncState::RestartPending => {
                self.state = SyncState::Idle;
                self.begin_sync(self.ids.peer_reported(), now)
            }
            SyncState::NoChangeSent => {
                self.settle();
                Vec::new()
            }
            SyncState::InitSent => {
                if self.items_to_send.is_empty() {
                    self.settle();
                    Vec::new()
                } else {
                    vec![self.send_item(0)]
                }
            }
            SyncState::SendingItem | SyncState::SendingItemHalf2 => {
                let next = self.current_index + 1;
                if next < self.items_to_send.len() {
                    vec![self.send_item(next)]
                } else {
                    self.state = SyncState::SendingDone;
                    let vibrate = if self.vibrate_on_completion {
                        self.settings.vibrate_pattern
                    } else {
                        VibratePattern::None
                    };
                    vec![self.send(Message::Done { vibrate })]
                }
            }
            SyncState::SendingItemHalf1 => {
                let payload = self.payload_at(self.current_index);
                self.state = SyncState::SendingItemHalf2;
                vec![self.send(Message::second_half(wire_index(self.current_index), &payload))]
            }
            SyncState::SendingDone => {
                self.last_sync = Some(now);
                self.ids.mark_success();
                self.last_successful_items = Some(self.items_to_send.clone());
                self.vibrate_on_completion = false;
                self.settle();
                tracing::info!(
                    sync_id = %self.ids.current(),
                    items = self.items_to_send.len(),
                    "sync complete"
                );
                vec![Action::EmitStatus(self.status())]
            }
            SyncState::Idle | SyncState::WaitingInitialData => {
                self.in_flight.clear();
                Vec::new()
            }
        }
    }

    fn on_nack(&mut self, transaction: TransactionId) -> Vec<Action> {
        if !self.in_flight.matches(transaction) {
            tracing::debug!(%transaction, "ignoring nack for unknown transaction");
            return Vec::new();
        }

        match self.in_flight.on_nack() {
            RetryDecision::Resend { generation } => {
                tracing::debug!(
                    %transaction,
                    retries = self.in_flight.retries(),
                    "scheduling resend"
                );
                vec![Action::ScheduleResend {
                    generation,
                    delay: self.config.resend_delay(),
                }]
            }
            RetryDecision::Exhausted => {
                tracing::info!(
                    %transaction,
                    state = %self.state,
                    "retries exhausted, abandoning transfer"
                );
                self.in_flight.clear();
                self.force_full_sync = false;
                if self.state != SyncState::WaitingInitialData {
                    self.state = SyncState::Idle;
                }
                Vec::new()
            }
        }
    }

    fn on_resend_timer(&mut self, generation: u64) -> Vec<Action> {
        match self.in_flight.resend(generation) {
            Some((transaction, message)) => {
                tracing::debug!(%transaction, retries = self.in_flight.retries(), "resending");
                vec![Action::Send {
                    transaction,
                    message,
                }]
            }
            None => {
                tracing::debug!(generation, "dropping superseded resend");
                Vec::new()
            }
        }
    }

    fn send_item(&mut self, index: usize) -> Action {
        self.current_index = index;
        let payload = self.payload_at(index);
        let wire = wire_index(index);
        if fits_single_message(&self.items_to_send[index]) {
            self.state = SyncState::SendingItem;
            self.send(Message::Item {
                index: wire,
                payload,
            })
        } else {
            self.state = SyncState::SendingItemHalf1;
            self.send(Message::first_half(wire, &payload))
        }
    }

    fn payload_at(&self, index: usize) -> ItemPayload {
        ItemPayload::from_item(&self.items_to_send[index], &self.settings)
    }

    fn send(&mut self, message: Message) -> Action {
        let message = message.to_dictionary();
        let transaction = self.in_flight.begin(message.clone());
        Action::Send {
            transaction,
            message,
        }
    }

    /// Back to idle. A forced full sync still pending is dropped with the transfer.
    fn settle(&mut self) {
        self.state = SyncState::Idle;
        self.in_flight.clear();
        self.force_full_sync = false;
    }
}

fn wire_index(index: usize) -> u8 {
    u8::try_from(index).unwrap_or(u8::MAX)
}
