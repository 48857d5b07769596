//! CLI command implementations.

pub mod preview;
pub mod simulate;
pub mod wire_time;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use sync_client::CalendarEvent;
use sync_types::{AgendaItem, SourceId};

/// Source id the calendar events are published under.
pub const CALENDAR_SOURCE: &str = "calendar";

/// Contents of an `--items` file.
#[derive(Debug, Default)]
pub struct ItemsFile {
    /// Ready-made agenda items, each naming its own source.
    pub items: Vec<AgendaItem>,
    /// Calendar events, mapped through the calendar source.
    pub events: Vec<CalendarEvent>,
}

/// The file as written, before each entry is checked.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawItemsFile {
    items: Vec<serde_json::Value>,
    events: Vec<serde_json::Value>,
}

impl ItemsFile {
    /// Read and parse a JSON items file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read items file {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("invalid items file {}", path.display()))
    }

    /// Parse file contents.
    ///
    /// Only the outer shape must be valid. A malformed item or event is
    /// logged and skipped; the rest of the file is kept.
    pub fn parse(contents: &str) -> Result<Self> {
        let raw: RawItemsFile = serde_json::from_str(contents)?;
        Ok(Self {
            items: decode_each("item", raw.items),
            events: decode_each("event", raw.events),
        })
    }

    /// Items grouped by the source that owns them.
    pub fn by_source(&self) -> BTreeMap<SourceId, Vec<AgendaItem>> {
        let mut groups: BTreeMap<SourceId, Vec<AgendaItem>> = BTreeMap::new();
        for item in &self.items {
            groups
                .entry(item.source_id().clone())
                .or_default()
                .push(item.clone());
        }
        groups
    }
}

fn decode_each<T: DeserializeOwned>(kind: &str, values: Vec<serde_json::Value>) -> Vec<T> {
    values
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value(value) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(kind, index, error = %e, "skipping invalid entry");
                None
            }
        })
        .collect()
}

/// The calendar source id.
pub fn calendar_source() -> Result<SourceId> {
    Ok(SourceId::new(CALENDAR_SOURCE)?)
}
