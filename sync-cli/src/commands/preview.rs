//! Print the list a sync would send.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::Path;
use sync_client::calendar_items;
use sync_core::{build_sync_list, PerSourceStore};
use sync_types::{fits_single_message, sendable_text, AgendaItem};

use super::{calendar_source, ItemsFile};
use crate::config::Config;

/// Run the preview command.
pub fn run(config: &Config, items: &Path, now: Option<&str>) -> Result<()> {
    let now = match now {
        Some(s) => DateTime::parse_from_rfc3339(s)
            .with_context(|| format!("invalid --now instant: {}", s))?
            .with_timezone(&Utc),
        None => Utc::now(),
    };
    let file = ItemsFile::load(items)?;
    let list = sync_list(config, &file, now)?;

    println!("=== agenda-sync preview ===");
    println!("{} item(s) at {}", list.len(), now.to_rfc3339());
    for (index, item) in list.iter().enumerate() {
        println!("{}", describe(index, item));
    }
    Ok(())
}

/// Aggregate the file the same way the engine does before a sync.
fn sync_list(config: &Config, file: &ItemsFile, now: DateTime<Utc>) -> Result<Vec<AgendaItem>> {
    let mut store = PerSourceStore::new();
    for (source, items) in file.by_source() {
        store.publish(source, items);
    }
    if !file.events.is_empty() {
        let source = calendar_source()?;
        let items = calendar_items(&source, &config.calendar, &file.events, now);
        store.publish(source, items);
    }
    Ok(build_sync_list(
        &store,
        now,
        config.engine.effective_max_items(),
    ))
}

fn describe(index: usize, item: &AgendaItem) -> String {
    let mode = if fits_single_message(item) {
        "single"
    } else {
        "split"
    };
    let mut line = format!(
        "[{}] {:<6} start={} end={} source={} | {}",
        index,
        mode,
        item.start_wire_time(),
        item.end_wire_time(),
        item.source_id(),
        sendable_text(&item.line1().text),
    );
    if let Some(line2) = item.line2() {
        line.push_str(" | ");
        line.push_str(&sendable_text(&line2.text));
    }
    line
}
