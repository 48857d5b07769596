//! AgendaService - the runtime around the sync engine.
//!
//! The service owns the [`SyncEngine`] and is the only task that touches it.
//! Commands from the application, events from the link and timer firings
//! all arrive on channels and are handled one at a time, so protocol state
//! is never mutated concurrently.
//!
//! # Architecture
//!
//! ```text
//! Sources ──publish──┐
//! Application ───────┼─► AgendaService ─► Transport ─► Watch
//! Link events ───────┘        ↓
//!                      sync-core (pure engine)
//! ```
//!
//! # Example
//!
//! ```ignore
//! let (link_tx, link_rx) = tokio::sync::mpsc::unbounded_channel();
//! let (service, handle) = AgendaService::new(engine_config, settings, transport, link_rx);
//! let task = tokio::spawn(service.with_registry(registry).run());
//!
//! let mut status = handle.subscribe_status();
//! handle.force_sync().await?;
//! ```

use chrono::Utc;
use std::collections::VecDeque;
use std::time::Duration;
use sync_core::{Action, EngineConfig, Event, Status, SyncEngine};
use sync_types::{AgendaItem, DisplaySettings, PeerRequest, SourceId};
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};

use crate::transport::{Transport, TransportEvent};
use crate::{LogNotifier, Notifier, Publisher, ServiceError, SourceRegistry};

const COMMAND_CAPACITY: usize = 64;

/// Requests handled by the service task.
#[derive(Debug)]
pub(crate) enum Command {
    /// Feed an event to the engine.
    Engine(Event),
    /// Ask every source to refresh.
    RefreshSources,
    /// Stop the service.
    Shutdown,
}

pub(crate) type CommandSender = mpsc::Sender<Command>;

/// Cloneable handle for talking to a running [`AgendaService`].
#[derive(Debug, Clone)]
pub struct ServiceHandle {
    commands: CommandSender,
    status: watch::Receiver<Status>,
}

impl ServiceHandle {
    /// Replace the list published by `source`.
    pub async fn publish(
        &self,
        source: SourceId,
        items: Vec<AgendaItem>,
        vibrate: bool,
    ) -> Result<(), ServiceError> {
        self.publisher(source).publish(items, vibrate).await
    }

    /// A publisher bound to one source.
    pub fn publisher(&self, source: SourceId) -> Publisher {
        Publisher::new(source, self.commands.clone())
    }

    /// Send the full dataset, ignoring what the watch already holds.
    pub async fn force_sync(&self) -> Result<(), ServiceError> {
        self.send(Command::Engine(Event::ForceSync)).await
    }

    /// Prompt the watch to send a request.
    pub async fn force_request(&self) -> Result<(), ServiceError> {
        self.send(Command::Engine(Event::ForceRequest)).await
    }

    /// Ask every registered source for fresh data.
    pub async fn refresh_sources(&self) -> Result<(), ServiceError> {
        self.send(Command::RefreshSources).await
    }

    /// Drop all source data and restart the startup window.
    pub async fn reset(&self) -> Result<(), ServiceError> {
        self.send(Command::Engine(Event::Reset)).await
    }

    /// Stop the service. Pending timers are abandoned.
    pub async fn shutdown(&self) -> Result<(), ServiceError> {
        self.send(Command::Shutdown).await
    }

    /// The latest status.
    pub fn status(&self) -> Status {
        *self.status.borrow()
    }

    /// Subscribe to status updates.
    pub fn subscribe_status(&self) -> watch::Receiver<Status> {
        self.status.clone()
    }

    async fn send(&self, command: Command) -> Result<(), ServiceError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| ServiceError::Stopped)
    }
}

/// The sync service.
///
/// Construct with [`AgendaService::new`], configure, then drive with
/// [`AgendaService::run`] on a tokio task. The task ends on
/// [`ServiceHandle::shutdown`] or once every handle is dropped.
pub struct AgendaService<T: Transport> {
    engine: SyncEngine,
    transport: T,
    registry: SourceRegistry,
    notifier: Box<dyn Notifier>,
    commands: mpsc::Receiver<Command>,
    self_commands: mpsc::WeakSender<Command>,
    link: mpsc::UnboundedReceiver<TransportEvent>,
    link_open: bool,
    status: watch::Sender<Status>,
    refresh_interval: Duration,
}

impl<T: Transport> AgendaService<T> {
    /// Create a service and its handle.
    ///
    /// `link` carries acks, nacks and watch requests from the link layer.
    pub fn new(
        config: EngineConfig,
        settings: DisplaySettings,
        transport: T,
        link: mpsc::UnboundedReceiver<TransportEvent>,
    ) -> (Self, ServiceHandle) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let (status_tx, status_rx) = watch::channel(Status::default());
        let refresh_interval = config.source_refresh_interval();

        let service = Self {
            engine: SyncEngine::new(config, settings),
            transport,
            registry: SourceRegistry::new(),
            notifier: Box::new(LogNotifier),
            commands: command_rx,
            self_commands: command_tx.downgrade(),
            link,
            link_open: true,
            status: status_tx,
            refresh_interval,
        };
        let handle = ServiceHandle {
            commands: command_tx,
            status: status_rx,
        };
        (service, handle)
    }

    /// Use the given sources.
    pub fn with_registry(mut self, registry: SourceRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Show prompts through `notifier` instead of the log.
    pub fn with_notifier(mut self, notifier: impl Notifier) -> Self {
        self.notifier = Box::new(notifier);
        self
    }

    /// Run until shutdown.
    pub async fn run(mut self) {
        tracing::info!(sources = self.registry.len(), "sync service starting");
        let startup = self.engine.start();
        self.apply(startup).await;

        let mut refresh = tokio::time::interval_at(
            Instant::now() + self.refresh_interval,
            self.refresh_interval.max(Duration::from_millis(1)),
        );
        refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Engine(event)) => self.dispatch(event).await,
                    Some(Command::RefreshSources) => self.refresh_sources(),
                    Some(Command::Shutdown) | None => break,
                },
                event = self.link.recv(), if self.link_open => match event {
                    Some(event) => self.on_link_event(event).await,
                    None => {
                        tracing::warn!("link closed, no further acks or requests");
                        self.link_open = false;
                    }
                },
                _ = refresh.tick() => {
                    tracing::debug!("periodic source refresh");
                    self.refresh_sources();
                }
            }
        }

        tracing::info!("sync service stopped");
    }

    async fn on_link_event(&mut self, event: TransportEvent) {
        let event = match event {
            TransportEvent::Ack(transaction) => Event::Ack { transaction },
            TransportEvent::Nack(transaction) => Event::Nack { transaction },
            TransportEvent::PeerRequest(dict) => match PeerRequest::from_dictionary(&dict) {
                Ok(request) => Event::PeerRequest(request),
                Err(e) => {
                    tracing::warn!(error = %e, "dropping malformed peer request");
                    return;
                }
            },
        };
        self.dispatch(event).await;
    }

    async fn dispatch(&mut self, event: Event) {
        let actions = self.engine.handle(event, Utc::now());
        self.apply(actions).await;
    }

    /// Execute actions; a failed send is fed back as a nack.
    async fn apply(&mut self, actions: Vec<Action>) {
        let mut pending = VecDeque::from(actions);
        while let Some(action) = pending.pop_front() {
            match action {
                Action::Send {
                    transaction,
                    message,
                } => {
                    if let Err(e) = self.transport.send(transaction, &message).await {
                        tracing::warn!(%transaction, error = %e, "send failed, treating as nack");
                        let followup = self.engine.handle(Event::Nack { transaction }, Utc::now());
                        pending.extend(followup);
                    }
                }
                Action::ScheduleResend { generation, delay } => {
                    self.schedule(delay, Event::ResendTimer { generation });
                }
                Action::StartInitialDataTimer { window, delay } => {
                    self.schedule(delay, Event::InitialDataWindowElapsed { window });
                }
                Action::RefreshSources => self.refresh_sources(),
                Action::Notify(notification) => self.notifier.notify(notification),
                Action::EmitStatus(status) => {
                    self.status.send_replace(status);
                }
            }
        }
    }

    /// Deliver `event` back to this task after `delay`.
    ///
    /// Timers are never cancelled; the engine discards stale ones.
    fn schedule(&self, delay: Duration, event: Event) {
        let commands = self.self_commands.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(commands) = commands.upgrade() {
                let _ = commands.send(Command::Engine(event)).await;
            }
        });
    }

    fn refresh_sources(&self) {
        match self.self_commands.upgrade() {
            Some(commands) => self.registry.refresh_all(&commands),
            None => tracing::debug!("no handles left, skipping refresh"),
        }
    }
}

/// Spawn a service on the current runtime.
pub fn spawn<T: Transport>(service: AgendaService<T>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(service.run())
}
