//! Per-source item storage.
//!
//! Each data source owns exactly one list. A publish replaces the whole list
//! for that source; lists are never mutated in place.

use std::collections::BTreeMap;
use sync_types::{AgendaItem, SourceId};

/// Most recently published item list for every source.
#[derive(Debug, Clone, Default)]
pub struct PerSourceStore {
    lists: BTreeMap<SourceId, Vec<AgendaItem>>,
}

impl PerSourceStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the list for `source`.
    ///
    /// Items that claim a different owner are dropped. Returns `true` when the
    /// stored list changed by value.
    pub fn publish(&mut self, source: SourceId, items: Vec<AgendaItem>) -> bool {
        let total = items.len();
        let items: Vec<AgendaItem> = items
            .into_iter()
            .filter(|item| item.source_id() == &source)
            .collect();
        if items.len() != total {
            tracing::warn!(
                source = %source,
                dropped = total - items.len(),
                "dropping items published under a foreign source id"
            );
        }

        if self.lists.get(&source) == Some(&items) {
            return false;
        }
        self.lists.insert(source, items);
        true
    }

    /// The list published by `source`, if any.
    pub fn get(&self, source: &SourceId) -> Option<&[AgendaItem]> {
        self.lists.get(source).map(Vec::as_slice)
    }

    /// Every stored item, grouped by source.
    pub fn items(&self) -> impl Iterator<Item = &AgendaItem> {
        self.lists.values().flatten()
    }

    /// Number of sources that have published.
    pub fn source_count(&self) -> usize {
        self.lists.len()
    }

    /// Whether no source has published.
    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    /// Forget everything (forced full reset).
    pub fn clear(&mut self) {
        self.lists.clear();
    }
}
