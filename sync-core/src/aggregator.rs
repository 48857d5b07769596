//! Builds the list that is sent to the watch.
//!
//! The aggregator flattens every source's list, drops expired items, sorts by
//! [`AgendaItem::schedule_cmp`] and truncates. It is pure: the same store and
//! the same `now` always give the same sequence.

use chrono::{DateTime, Utc};
use sync_types::AgendaItem;

use crate::PerSourceStore;

/// Merge, filter, sort and truncate the published items.
pub fn build_sync_list(
    store: &PerSourceStore,
    now: DateTime<Utc>,
    max_count: usize,
) -> Vec<AgendaItem> {
    let mut items: Vec<AgendaItem> = store
        .items()
        .filter(|item| !item.is_expired(now))
        .cloned()
        .collect();

    // Stable sort: equal keys can only come from one source and keep its order.
    items.sort_by(AgendaItem::schedule_cmp);
    items.truncate(max_count);
    items
}
