//! The agenda item model.
//!
//! An [`AgendaItem`] is published by a data source and never mutated
//! afterwards: a source that has new content publishes a replacement list.
//! Items compare by value, which is what change detection relies on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::{wire_time, SourceId, Zone};

/// How the watch renders the time next to a line's text.
///
/// The discriminant is the value packed into the style byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum TimeDisplay {
    /// No time shown.
    None = 0,
    /// Start time only.
    StartTime = 1,
    /// End time only.
    EndTime = 2,
    /// Start and end time.
    StartAndEnd = 3,
    /// Time relative to now ("in 20 min").
    Relative = 4,
}

impl TimeDisplay {
    /// Map a stored ordinal back to a variant.
    pub fn from_ordinal(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::None),
            1 => Some(Self::StartTime),
            2 => Some(Self::EndTime),
            3 => Some(Self::StartAndEnd),
            4 => Some(Self::Relative),
            _ => None,
        }
    }
}

/// What the watch does with text that does not fit on one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Overflow {
    /// Clip the text.
    #[default]
    None = 0,
    /// Wrap onto a second row when needed.
    OverflowIfNecessary = 1,
}

/// One display row of an agenda item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Line {
    /// Row text, truncated by the codec if too long.
    pub text: String,
    /// Render the text in bold (the time is never bold).
    pub bold: bool,
    /// Time rendering; `None` inherits the per-line user preference.
    pub time_display: Option<TimeDisplay>,
    /// Count the time down; `None` inherits the user preference.
    pub show_countdown: Option<bool>,
    /// Overflow behaviour; `None` inherits the per-line user preference.
    pub overflow: Option<Overflow>,
}

impl Line {
    /// A plain line with the given text and default styling.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Set the bold flag.
    pub fn bold(mut self, bold: bool) -> Self {
        self.bold = bold;
        self
    }

    /// Override the time display mode.
    pub fn time_display(mut self, mode: TimeDisplay) -> Self {
        self.time_display = Some(mode);
        self
    }

    /// Override the countdown flag.
    pub fn countdown(mut self, enabled: bool) -> Self {
        self.show_countdown = Some(enabled);
        self
    }

    /// Set the overflow behaviour.
    pub fn overflow(mut self, overflow: Overflow) -> Self {
        self.overflow = Some(overflow);
        self
    }
}

/// One agenda entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgendaItem {
    line1: Line,
    #[serde(default)]
    line2: Option<Line>,
    #[serde(default)]
    start: Option<DateTime<Utc>>,
    #[serde(default)]
    end: Option<DateTime<Utc>>,
    #[serde(default)]
    priority: i32,
    source_id: SourceId,
    #[serde(default)]
    zone: Option<Zone>,
    #[serde(default)]
    all_day: bool,
}

impl AgendaItem {
    /// Create an item owned by `source_id` with a single line.
    pub fn new(source_id: SourceId, line1: Line) -> Self {
        Self {
            line1,
            line2: None,
            start: None,
            end: None,
            priority: 0,
            source_id,
            zone: None,
            all_day: false,
        }
    }

    /// Add a second line.
    pub fn with_line2(mut self, line: Line) -> Self {
        self.line2 = Some(line);
        self
    }

    /// Set the start time.
    pub fn with_start(mut self, start: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self
    }

    /// Set the end time.
    pub fn with_end(mut self, end: DateTime<Utc>) -> Self {
        self.end = Some(end);
        self
    }

    /// Set the priority (higher wins ties).
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Interpret start and end in the given zone instead of local time.
    pub fn with_zone(mut self, zone: Zone) -> Self {
        self.zone = Some(zone);
        self
    }

    /// Mark the item as an all-day entry. All-day entries are encoded in UTC.
    pub fn all_day(mut self) -> Self {
        self.all_day = true;
        self.zone = Some(Zone::Utc);
        self
    }

    /// First display line.
    pub fn line1(&self) -> &Line {
        &self.line1
    }

    /// Second display line, if any.
    pub fn line2(&self) -> Option<&Line> {
        self.line2.as_ref()
    }

    /// Start instant.
    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.start
    }

    /// End instant.
    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.end
    }

    /// Priority.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Owning source.
    pub fn source_id(&self) -> &SourceId {
        &self.source_id
    }

    /// Zone used for wire encoding (`None` = local).
    pub fn zone(&self) -> Option<Zone> {
        self.effective_zone()
    }

    /// Whether this is an all-day entry.
    pub fn is_all_day(&self) -> bool {
        self.all_day
    }

    fn effective_zone(&self) -> Option<Zone> {
        if self.all_day {
            Some(Zone::Utc)
        } else {
            self.zone
        }
    }

    /// Start time in wire format (`0` if open-ended).
    pub fn start_wire_time(&self) -> i32 {
        wire_time(self.start, self.effective_zone())
    }

    /// End time in wire format (`0` if open-ended).
    pub fn end_wire_time(&self) -> i32 {
        wire_time(self.end, self.effective_zone())
    }

    /// Whether the item has ended at `now`. Items without an end never expire.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.end.is_some_and(|end| end <= now)
    }

    /// Total order used for the synced list.
    ///
    /// Wire start time, then all-day before timed entries in the same slot,
    /// then descending priority, then ascending source id.
    pub fn schedule_cmp(&self, other: &Self) -> Ordering {
        self.start_wire_time()
            .cmp(&other.start_wire_time())
            .then_with(|| other.all_day.cmp(&self.all_day))
            .then_with(|| other.priority.cmp(&self.priority))
            .then_with(|| self.source_id.cmp(&other.source_id))
    }
}
