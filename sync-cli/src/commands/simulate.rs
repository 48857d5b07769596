//! Sync an item file to a simulated watch.
//!
//! The simulated watch sits behind the [`Transport`] seam: it decodes every
//! message, answers through the link channel like the real radio would and
//! keeps the dataset it has been sent.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use sync_client::{
    AgendaService, CalendarSource, SourceRegistry, StaticSource, Transport, TransportError,
    TransportEvent,
};
use sync_types::{
    Dictionary, Message, PeerRequest, SyncId, TransactionId, VibratePattern,
    DEFAULT_PEER_MIN_VERSION,
};
use tokio::sync::{mpsc, watch};

use super::{calendar_source, ItemsFile};
use crate::config::Config;

/// Version the simulated watch reports unless told otherwise.
pub const WATCH_VERSION: u8 = 9;

/// How long the link waits for a lost ack before reporting a nack.
const LINK_TIMEOUT: Duration = Duration::from_millis(250);

/// Knobs for one simulation run.
#[derive(Debug, Clone)]
pub struct Options {
    /// Nack every Nth received message.
    pub nack_every: Option<u32>,
    /// Lose the ack of the first item message.
    pub drop_ack: bool,
    /// Version the watch reports in its requests.
    pub watch_version: u8,
    /// Overall deadline.
    pub timeout: Duration,
}

/// A dataset the watch accepted in full.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Id of the dataset now held.
    pub sync_id: SyncId,
    /// First-line texts in the order received.
    pub items: Vec<String>,
    /// Vibration requested by the done message.
    pub vibrate: VibratePattern,
    /// The phone reported nothing new.
    pub unchanged: bool,
}

/// Run the simulate command.
pub async fn run(config: &Config, items: &Path, options: Options) -> Result<()> {
    let file = ItemsFile::load(items)?;

    let mut registry = SourceRegistry::new();
    for (source, items) in file.by_source() {
        registry.register(StaticSource::new(source, items));
    }
    if !file.events.is_empty() {
        registry.register(CalendarSource::new(
            calendar_source()?,
            config.calendar.clone(),
            file.events.clone(),
        ));
    }

    let (link_tx, link_rx) = mpsc::unbounded_channel();
    let (watch, mut delivered) = SimulatedWatch::new(link_tx, &options);
    let (service, handle) =
        AgendaService::new(config.engine.clone(), config.display.clone(), watch, link_rx);
    let task = sync_client::spawn(service.with_registry(registry));

    println!("=== agenda-sync simulate ===");
    let delivery = {
        let waited =
            tokio::time::timeout(options.timeout, delivered.wait_for(Option::is_some)).await;
        match waited {
            Ok(Ok(guard)) => (*guard).clone(),
            Ok(Err(_)) | Err(_) => None,
        }
    };
    let status = handle.status();

    handle.shutdown().await?;
    task.await.context("sync service panicked")?;

    let Some(delivery) = delivery else {
        anyhow::bail!(
            "no dataset delivered within {}s",
            options.timeout.as_secs_f32()
        );
    };

    println!();
    if delivery.unchanged {
        println!("Watch already current (sync id {})", delivery.sync_id);
    } else {
        println!(
            "Sync complete: {} item(s), sync id {}, vibrate {:?}",
            delivery.items.len(),
            delivery.sync_id,
            delivery.vibrate
        );
        for (index, text) in delivery.items.iter().enumerate() {
            println!("  [{}] {}", index, text);
        }
    }
    println!("Watch version: {}", status.peer_version);
    Ok(())
}

// =========================================================================
// Simulated watch
// =========================================================================

#[derive(Debug, Default)]
struct WatchState {
    received: u32,
    dropped: bool,
    held: SyncId,
    incoming: SyncId,
    expected: usize,
    items: Vec<String>,
}

enum Reply {
    Ack,
    Nack,
    Lost,
}

/// A watch living in-process, answering over the link channel.
struct SimulatedWatch {
    state: Arc<Mutex<WatchState>>,
    link: mpsc::UnboundedSender<TransportEvent>,
    delivered: watch::Sender<Option<Delivery>>,
    nack_every: Option<u32>,
    drop_ack: bool,
    version: u8,
}

impl SimulatedWatch {
    fn new(
        link: mpsc::UnboundedSender<TransportEvent>,
        options: &Options,
    ) -> (Self, watch::Receiver<Option<Delivery>>) {
        let (delivered, receiver) = watch::channel(None);
        let watch = Self {
            state: Arc::new(Mutex::new(WatchState::default())),
            link,
            delivered,
            nack_every: options.nack_every.filter(|n| *n > 0),
            drop_ack: options.drop_ack,
            version: options.watch_version,
        };
        (watch, receiver)
    }

    fn request(&self, held: SyncId) -> Dictionary {
        PeerRequest {
            version: self.version,
            min_version: DEFAULT_PEER_MIN_VERSION,
            last_sync_id: held,
        }
        .to_dictionary()
    }

    /// Decide the reply and, when accepted, apply the message.
    fn receive(&self, message: &Message) -> (Reply, Option<Delivery>) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.received += 1;

        if self.nack_every.is_some_and(|n| state.received % n == 0) {
            return (Reply::Nack, None);
        }
        let is_item = matches!(message, Message::Item { .. } | Message::ItemHalf1 { .. });
        if self.drop_ack && is_item && !state.dropped {
            state.dropped = true;
            return (Reply::Lost, None);
        }

        let delivery = match message {
            Message::Init {
                item_count,
                sync_id,
                ..
            } => {
                state.incoming = *sync_id;
                state.expected = usize::from(*item_count);
                state.items.clear();
                (state.expected == 0).then(|| {
                    state.held = *sync_id;
                    Delivery {
                        sync_id: *sync_id,
                        items: Vec::new(),
                        vibrate: VibratePattern::None,
                        unchanged: false,
                    }
                })
            }
            Message::Item { payload, .. } => {
                state.items.push(payload.text1.clone());
                None
            }
            Message::ItemHalf1 { text1, .. } => {
                state.items.push(text1.clone());
                None
            }
            Message::Done { vibrate } => {
                state.held = state.incoming;
                if state.items.len() != state.expected {
                    tracing::warn!(
                        expected = state.expected,
                        received = state.items.len(),
                        "dataset incomplete"
                    );
                }
                Some(Delivery {
                    sync_id: state.held,
                    items: state.items.clone(),
                    vibrate: *vibrate,
                    unchanged: false,
                })
            }
            Message::NoNewData => Some(Delivery {
                sync_id: state.held,
                items: state.items.clone(),
                vibrate: VibratePattern::None,
                unchanged: true,
            }),
            Message::ItemHalf2 { .. } | Message::ForceRequest => None,
        };
        (Reply::Ack, delivery)
    }

    fn held(&self) -> SyncId {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .held
    }

    fn report(&self, event: TransportEvent) -> Result<(), TransportError> {
        self.link.send(event).map_err(|_| TransportError::NotConnected)
    }
}

#[async_trait]
impl Transport for SimulatedWatch {
    async fn send(
        &self,
        transaction: TransactionId,
        message: &Dictionary,
    ) -> Result<(), TransportError> {
        let message = Message::from_dictionary(message)
            .map_err(|e| TransportError::SendFailed(e.to_string()))?;
        let (reply, delivery) = self.receive(&message);

        match reply {
            Reply::Ack => {
                println!("-> #{:<3} {:<48} ack", transaction, describe(&message));
                self.report(TransportEvent::Ack(transaction))?;
            }
            Reply::Nack => {
                println!("-> #{:<3} {:<48} nack", transaction, describe(&message));
                self.report(TransportEvent::Nack(transaction))?;
                return Ok(());
            }
            Reply::Lost => {
                println!("-> #{:<3} {:<48} (ack lost)", transaction, describe(&message));
                let link = self.link.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(LINK_TIMEOUT).await;
                    let _ = link.send(TransportEvent::Nack(transaction));
                });
                return Ok(());
            }
        }

        if matches!(message, Message::ForceRequest) {
            let held = self.held();
            println!("<- request version={} last_sync_id={}", self.version, held);
            self.report(TransportEvent::PeerRequest(self.request(held)))?;
        }
        if let Some(delivery) = delivery {
            self.delivered.send_replace(Some(delivery));
        }
        Ok(())
    }
}

fn describe(message: &Message) -> String {
    match message {
        Message::Init {
            item_count,
            sync_id,
            ..
        } => format!("init items={} sync_id={}", item_count, sync_id),
        Message::NoNewData => "no-new-data".to_string(),
        Message::Done { vibrate } => format!("done vibrate={:?}", vibrate),
        Message::ForceRequest => "force-request".to_string(),
        Message::Item { index, payload } => format!("item[{}] {:?}", index, payload.text1),
        Message::ItemHalf1 { index, text1, .. } => format!("item-half-1[{}] {:?}", index, text1),
        Message::ItemHalf2 { index, text2, .. } => format!("item-half-2[{}] {:?}", index, text2),
    }
}
