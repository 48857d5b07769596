//! End-to-end tests for AgendaService over the mock transport.
//!
//! Time is paused, so the resend delay, startup window and refresh interval
//! elapse instantly but in order.

use agenda_sync_client::{
    spawn, AgendaService, DataSource, MockTransport, Publisher, RecordingNotifier, SentMessage,
    ServiceError, ServiceHandle, SourceRegistry, StaticSource, TransportEvent,
};
use async_trait::async_trait;
use chrono::Utc;
use std::time::Duration;
use sync_core::{EngineConfig, Notification};
use sync_types::{
    AgendaItem, Dictionary, DisplaySettings, Line, Message, PeerRequest, SourceId, SyncId,
    TransactionId, VibratePattern,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{timeout, Instant};

// ============================================================================
// Harness
// ============================================================================

struct Harness {
    handle: ServiceHandle,
    link: mpsc::UnboundedSender<TransportEvent>,
    sent: mpsc::UnboundedReceiver<SentMessage>,
    transport: MockTransport,
    notifier: RecordingNotifier,
    task: JoinHandle<()>,
}

impl Harness {
    fn new(registry: SourceRegistry) -> Self {
        let (transport, sent) = MockTransport::with_tap();
        let (link, link_rx) = mpsc::unbounded_channel();
        let notifier = RecordingNotifier::new();
        let (service, handle) = AgendaService::new(
            EngineConfig::default(),
            DisplaySettings::default(),
            transport.clone(),
            link_rx,
        );
        let task = spawn(
            service
                .with_registry(registry)
                .with_notifier(notifier.clone()),
        );
        Self {
            handle,
            link,
            sent,
            transport,
            notifier,
            task,
        }
    }

    async fn next(&mut self) -> (TransactionId, Message) {
        let sent = timeout(Duration::from_secs(3_600), self.sent.recv())
            .await
            .expect("no message within an hour")
            .expect("transport tap closed");
        (sent.transaction, Message::from_dictionary(&sent.message).unwrap())
    }

    fn ack(&self, transaction: TransactionId) {
        self.link.send(TransportEvent::Ack(transaction)).unwrap();
    }

    fn nack(&self, transaction: TransactionId) {
        self.link.send(TransportEvent::Nack(transaction)).unwrap();
    }

    fn request(&self, version: u8, last_sync_id: u8) {
        let request = PeerRequest {
            version,
            min_version: 4,
            last_sync_id: SyncId::new(last_sync_id),
        };
        self.link
            .send(TransportEvent::PeerRequest(request.to_dictionary()))
            .unwrap();
    }
}

fn source(id: &str) -> SourceId {
    SourceId::new(id).unwrap()
}

fn upcoming(text: &str) -> AgendaItem {
    let start = Utc::now() + chrono::Duration::hours(1);
    AgendaItem::new(source("A"), Line::new(text))
        .with_start(start)
        .with_end(start + chrono::Duration::hours(1))
}

// ============================================================================
// Startup
// ============================================================================

#[tokio::test(start_paused = true)]
async fn startup_sends_force_request_after_window() {
    let mut h = Harness::new(SourceRegistry::new());
    let start = Instant::now();

    let (_, message) = h.next().await;
    assert_eq!(message, Message::ForceRequest);
    assert!(start.elapsed() >= Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn requests_during_window_are_ignored() {
    let mut h = Harness::new(SourceRegistry::new());
    h.request(9, 0);

    let (_, message) = h.next().await;
    assert_eq!(message, Message::ForceRequest);
    assert_eq!(h.transport.sent().len(), 1);
    assert_eq!(h.handle.status().peer_version, -1);
}

// ============================================================================
// Sync over the link
// ============================================================================

#[tokio::test(start_paused = true)]
async fn full_sync_over_link() {
    let mut h = Harness::new(SourceRegistry::new());
    h.handle
        .publish(source("A"), vec![upcoming("Dentist")], true)
        .await
        .unwrap();
    h.next().await; // force request

    h.request(9, 0);
    let (tx, init) = h.next().await;
    assert!(matches!(init, Message::Init { item_count: 1, .. }));

    h.ack(tx);
    let (tx, item) = h.next().await;
    assert!(matches!(item, Message::Item { index: 0, .. }));

    h.ack(tx);
    let (tx, done) = h.next().await;
    assert_eq!(
        done,
        Message::Done {
            vibrate: VibratePattern::Short
        }
    );

    h.ack(tx);
    let mut status = h.handle.subscribe_status();
    let status = *status.wait_for(|s| s.last_sync.is_some()).await.unwrap();
    assert_eq!(status.peer_version, 9);
}

#[tokio::test(start_paused = true)]
async fn registered_sources_feed_the_sync() {
    let mut registry = SourceRegistry::new();
    registry.register(StaticSource::new(
        source("A"),
        vec![upcoming("Dentist"), upcoming("Gym")],
    ));
    let mut h = Harness::new(registry);
    h.next().await; // force request

    h.request(9, 0);
    let (_, init) = h.next().await;
    assert!(matches!(init, Message::Init { item_count: 2, .. }));
}

#[tokio::test(start_paused = true)]
async fn force_sync_from_handle() {
    let mut h = Harness::new(SourceRegistry::new());
    h.next().await; // force request

    h.handle.force_sync().await.unwrap();
    let (_, init) = h.next().await;
    assert!(matches!(init, Message::Init { item_count: 0, .. }));
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test(start_paused = true)]
async fn nack_triggers_delayed_resend() {
    let mut h = Harness::new(SourceRegistry::new());
    h.next().await; // force request

    h.request(9, 0);
    let (tx, init) = h.next().await;
    h.nack(tx);
    let start = Instant::now();

    let (resent_tx, resent) = h.next().await;
    assert!(start.elapsed() >= Duration::from_secs(3));
    assert_ne!(resent_tx, tx);
    assert_eq!(resent, init);
}

#[tokio::test(start_paused = true)]
async fn failed_send_is_retried() {
    let mut h = Harness::new(SourceRegistry::new());
    h.next().await; // force request

    h.transport.fail_next_send("link busy");
    h.request(9, 0);
    let start = Instant::now();

    let (_, init) = h.next().await;
    assert!(matches!(init, Message::Init { .. }));
    assert!(start.elapsed() >= Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn malformed_request_is_dropped() {
    let mut h = Harness::new(SourceRegistry::new());
    h.next().await; // force request

    h.link
        .send(TransportEvent::PeerRequest(Dictionary::new()))
        .unwrap();
    h.request(9, 0);

    let (_, message) = h.next().await;
    assert!(matches!(message, Message::Init { .. }));
    assert_eq!(h.transport.sent().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn outdated_watch_is_notified() {
    let mut h = Harness::new(SourceRegistry::new());
    h.next().await; // force request

    h.request(3, 0);
    let mut status = h.handle.subscribe_status();
    status.wait_for(|s| s.peer_version == 3).await.unwrap();

    assert_eq!(
        h.notifier.seen(),
        vec![Notification::PeerOutdated { reported: 3 }]
    );
    assert_eq!(h.transport.sent().len(), 1);
}

// ============================================================================
// Refresh, reset and shutdown
// ============================================================================

struct CountingSource {
    refreshes: mpsc::UnboundedSender<()>,
}

#[async_trait]
impl DataSource for CountingSource {
    fn id(&self) -> SourceId {
        source("counting")
    }

    async fn refresh(&self, publisher: Publisher) -> Result<(), ServiceError> {
        let _ = self.refreshes.send(());
        publisher.publish(Vec::new(), false).await
    }
}

#[tokio::test(start_paused = true)]
async fn sources_refresh_periodically() {
    let (refreshes, mut seen) = mpsc::unbounded_channel();
    let mut registry = SourceRegistry::new();
    registry.register(CountingSource { refreshes });
    let _h = Harness::new(registry);
    let start = Instant::now();

    seen.recv().await.unwrap(); // startup
    seen.recv().await.unwrap();
    assert!(start.elapsed() >= Duration::from_secs(30 * 60));
}

#[tokio::test(start_paused = true)]
async fn refresh_on_demand() {
    let (refreshes, mut seen) = mpsc::unbounded_channel();
    let mut registry = SourceRegistry::new();
    registry.register(CountingSource { refreshes });
    let h = Harness::new(registry);
    seen.recv().await.unwrap(); // startup

    h.handle.refresh_sources().await.unwrap();
    let start = Instant::now();
    seen.recv().await.unwrap();
    assert!(start.elapsed() < Duration::from_secs(60));
}

#[tokio::test(start_paused = true)]
async fn reset_reopens_startup_window() {
    let mut h = Harness::new(SourceRegistry::new());
    h.next().await; // force request

    h.handle.reset().await.unwrap();
    let start = Instant::now();
    let (_, message) = h.next().await;
    assert_eq!(message, Message::ForceRequest);
    assert!(start.elapsed() >= Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_the_service() {
    let h = Harness::new(SourceRegistry::new());
    h.handle.shutdown().await.unwrap();
    h.task.await.unwrap();

    assert!(matches!(
        h.handle.force_sync().await,
        Err(ServiceError::Stopped)
    ));
}
