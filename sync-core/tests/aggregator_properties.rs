//! Property-based tests for the aggregator.
//!
//! Uses proptest to check the invariants of `build_sync_list` over arbitrary
//! per-source lists.

use agenda_sync_core::{build_sync_list, PerSourceStore};
use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use sync_types::{AgendaItem, Line, SourceId, Zone};

// ============================================================================
// Strategy Generators
// ============================================================================

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
}

/// One item owned by `source`, times in minutes from `base()`.
fn item_strategy(source: &'static str) -> impl Strategy<Value = AgendaItem> {
    (
        "[a-z ]{1,12}",
        proptest::option::of(0i64..2000),
        proptest::option::of(0i64..240),
        -3i32..3,
        any::<bool>(),
    )
        .prop_map(move |(text, start, length, priority, all_day)| {
            let mut item = AgendaItem::new(SourceId::new(source).unwrap(), Line::new(text))
                .with_priority(priority)
                .with_zone(Zone::Utc);
            if let Some(start) = start {
                let start = base() + Duration::minutes(start);
                item = item.with_start(start);
                if let Some(length) = length {
                    item = item.with_end(start + Duration::minutes(length));
                }
            }
            if all_day {
                item = item.all_day();
            }
            item
        })
}

fn store_strategy() -> impl Strategy<Value = PerSourceStore> {
    (
        prop::collection::vec(item_strategy("calendar"), 0..12),
        prop::collection::vec(item_strategy("tasks"), 0..12),
        prop::collection::vec(item_strategy("weather"), 0..4),
    )
        .prop_map(|(calendar, tasks, weather)| {
            let mut store = PerSourceStore::new();
            store.publish(SourceId::new("calendar").unwrap(), calendar);
            store.publish(SourceId::new("tasks").unwrap(), tasks);
            store.publish(SourceId::new("weather").unwrap(), weather);
            store
        })
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    /// Repeated calls with the same inputs give the same sequence
    #[test]
    fn build_is_deterministic(store in store_strategy(), now in 0i64..2000, max in 0usize..20) {
        let now = base() + Duration::minutes(now);
        prop_assert_eq!(build_sync_list(&store, now, max), build_sync_list(&store, now, max));
    }

    /// Adjacent items are in schedule order
    #[test]
    fn output_is_ordered(store in store_strategy(), now in 0i64..2000) {
        let now = base() + Duration::minutes(now);
        let list = build_sync_list(&store, now, 255);
        for pair in list.windows(2) {
            prop_assert_ne!(pair[0].schedule_cmp(&pair[1]), std::cmp::Ordering::Greater);
        }
    }

    /// Nothing that ended at or before `now` is sent
    #[test]
    fn expired_items_never_appear(store in store_strategy(), now in 0i64..2000) {
        let now = base() + Duration::minutes(now);
        for item in build_sync_list(&store, now, 255) {
            prop_assert!(item.end().map_or(true, |end| end > now));
        }
    }

    /// Output never exceeds the limit
    #[test]
    fn output_is_bounded(store in store_strategy(), max in 0usize..30) {
        let list = build_sync_list(&store, base(), max);
        prop_assert!(list.len() <= max);
    }

    /// Truncation keeps a prefix of the full ordering
    #[test]
    fn truncation_keeps_prefix(store in store_strategy(), max in 0usize..30) {
        let full = build_sync_list(&store, base(), usize::MAX);
        let cut = build_sync_list(&store, base(), max);
        prop_assert_eq!(&full[..cut.len()], &cut[..]);
    }
}
