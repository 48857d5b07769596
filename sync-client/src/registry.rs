//! Data source registration.
//!
//! Sources are push-style producers: when asked to refresh they publish
//! their complete current list through a [`Publisher`]. Registering a source
//! is an explicit call; there is no discovery.

use async_trait::async_trait;
use std::sync::Arc;
use sync_types::{AgendaItem, SourceId};

use crate::service::{Command, CommandSender};
use crate::ServiceError;
use sync_core::Event;

/// A producer of agenda items.
#[async_trait]
pub trait DataSource: Send + Sync + 'static {
    /// Stable id under which this source publishes.
    fn id(&self) -> SourceId;

    /// Gather current data and publish it.
    ///
    /// Publishing an unchanged list is cheap; the engine ignores it.
    async fn refresh(&self, publisher: Publisher) -> Result<(), ServiceError>;
}

/// Publishes item lists on behalf of one source.
#[derive(Debug, Clone)]
pub struct Publisher {
    source: SourceId,
    commands: CommandSender,
}

impl Publisher {
    pub(crate) fn new(source: SourceId, commands: CommandSender) -> Self {
        Self { source, commands }
    }

    /// The source this publisher speaks for.
    pub fn source(&self) -> &SourceId {
        &self.source
    }

    /// Replace this source's list. `vibrate` asks the watch to vibrate when
    /// the resulting sync completes.
    pub async fn publish(&self, items: Vec<AgendaItem>, vibrate: bool) -> Result<(), ServiceError> {
        self.commands
            .send(Command::Engine(Event::Publish {
                source: self.source.clone(),
                items,
                vibrate,
            }))
            .await
            .map_err(|_| ServiceError::Stopped)
    }
}

/// The set of registered sources.
#[derive(Clone, Default)]
pub struct SourceRegistry {
    sources: Vec<Arc<dyn DataSource>>,
}

impl SourceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source. A later source with the same id replaces the
    /// earlier one.
    pub fn register(&mut self, source: impl DataSource) -> &mut Self {
        let source: Arc<dyn DataSource> = Arc::new(source);
        let id = source.id();
        self.sources.retain(|existing| existing.id() != id);
        self.sources.push(source);
        self
    }

    /// Ids of all registered sources.
    pub fn ids(&self) -> Vec<SourceId> {
        self.sources.iter().map(|source| source.id()).collect()
    }

    /// Number of registered sources.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Whether no source is registered.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Ask every source to refresh, each in its own task.
    ///
    /// A failing source is logged and skipped; the others are unaffected.
    pub(crate) fn refresh_all(&self, commands: &CommandSender) {
        for source in &self.sources {
            let source = Arc::clone(source);
            let publisher = Publisher::new(source.id(), commands.clone());
            tokio::spawn(async move {
                let id = source.id();
                if let Err(e) = source.refresh(publisher).await {
                    tracing::warn!(source = %id, error = %e, "source refresh failed");
                }
            });
        }
    }
}

impl std::fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceRegistry")
            .field("sources", &self.ids())
            .finish()
    }
}

/// A source that always publishes the same list.
///
/// Useful for fixed reminders and for tests.
#[derive(Debug, Clone)]
pub struct StaticSource {
    id: SourceId,
    items: Vec<AgendaItem>,
}

impl StaticSource {
    /// Create a source publishing `items` under `id`.
    pub fn new(id: SourceId, items: Vec<AgendaItem>) -> Self {
        Self { id, items }
    }
}

#[async_trait]
impl DataSource for StaticSource {
    fn id(&self) -> SourceId {
        self.id.clone()
    }

    async fn refresh(&self, publisher: Publisher) -> Result<(), ServiceError> {
        publisher.publish(self.items.clone(), false).await
    }
}
