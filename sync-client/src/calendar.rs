//! Calendar events as an agenda source.
//!
//! Calendar events are mapped onto agenda items according to a
//! [`CalendarLayout`]: which field goes on which line. All-day events are
//! encoded in UTC and never show a time.

use async_trait::async_trait;
use chrono::{DateTime, Days, Local, NaiveDate, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use sync_types::{AgendaItem, Line, SourceId, TimeDisplay};
use tokio::sync::RwLock;

use crate::{DataSource, Publisher, ServiceError};

/// One event read from a calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    /// Calendar the event belongs to.
    pub calendar_id: String,
    /// Event title.
    pub title: String,
    /// Event location.
    #[serde(default)]
    pub location: Option<String>,
    /// Start instant (midnight UTC for all-day events).
    pub start: DateTime<Utc>,
    /// End instant.
    pub end: DateTime<Utc>,
    /// Whether the event spans whole days.
    #[serde(default)]
    pub all_day: bool,
}

/// Which event field a line shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineContent {
    /// The event title.
    Title,
    /// The event location (empty if unset).
    Location,
}

/// Line assignment for one kind of event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarLayout {
    /// Content of the first line.
    pub line1: LineContent,
    /// Content of the second line; `None` hides it.
    pub line2: Option<LineContent>,
}

impl CalendarLayout {
    fn timed_default() -> Self {
        Self {
            line1: LineContent::Title,
            line2: Some(LineContent::Location),
        }
    }

    fn all_day_default() -> Self {
        Self {
            line1: LineContent::Title,
            line2: None,
        }
    }
}

/// Calendar preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    /// Include all-day events.
    pub show_all_day_events: bool,
    /// Calendar ids whose events are never synced.
    pub excluded_calendars: Vec<String>,
    /// Layout for timed events.
    pub timed_layout: CalendarLayout,
    /// Layout for all-day events.
    pub all_day_layout: CalendarLayout,
    /// Days after today included, up to 23:59 local time on the last one.
    pub lookahead_days: u32,
    /// Most events published per refresh, earliest first.
    pub max_events: usize,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            show_all_day_events: true,
            excluded_calendars: Vec::new(),
            timed_layout: CalendarLayout::timed_default(),
            all_day_layout: CalendarLayout::all_day_default(),
            lookahead_days: 6,
            max_events: 30,
        }
    }
}

/// The span of time the calendar publishes: from 23:59 local yesterday to
/// 23:59 local on the last lookahead day.
fn window(now: DateTime<Utc>, lookahead_days: u32) -> (DateTime<Utc>, DateTime<Utc>) {
    let today = now.with_timezone(&Local).date_naive();
    let late_evening = |date: NaiveDate| {
        date.and_hms_opt(23, 59, 0)
            .and_then(|time| time.and_local_timezone(Local).earliest())
            .map(|time| time.with_timezone(&Utc))
    };
    let begin = today
        .pred_opt()
        .and_then(late_evening)
        .or_else(|| now.checked_sub_signed(TimeDelta::days(1)))
        .unwrap_or(now);
    let end = today
        .checked_add_days(Days::new(u64::from(lookahead_days)))
        .and_then(late_evening)
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    (begin, end)
}

/// Map calendar events to agenda items owned by `source`.
///
/// Only events overlapping the publishing window are kept, at most
/// `max_events` of them in start order.
pub fn calendar_items(
    source: &SourceId,
    config: &CalendarConfig,
    events: &[CalendarEvent],
    now: DateTime<Utc>,
) -> Vec<AgendaItem> {
    let (begin, end) = window(now, config.lookahead_days);
    let mut selected: Vec<&CalendarEvent> = events
        .iter()
        .filter(|event| event.end >= begin && event.start <= end)
        .filter(|event| !config.excluded_calendars.contains(&event.calendar_id))
        .filter(|event| config.show_all_day_events || !event.all_day)
        .filter(|event| event.all_day || event.end >= now)
        .collect();
    selected.sort_by_key(|event| event.start);
    selected.truncate(config.max_events);

    selected
        .into_iter()
        .map(|event| {
            let layout = if event.all_day {
                &config.all_day_layout
            } else {
                &config.timed_layout
            };
            let mut line1 =
                Line::new(field(event, layout.line1)).bold(layout.line1 == LineContent::Title);
            if event.all_day {
                line1 = line1.time_display(TimeDisplay::None);
            }

            let mut item = AgendaItem::new(source.clone(), line1)
                .with_start(event.start)
                .with_end(event.end);
            if let Some(content) = layout.line2 {
                let mut line2 =
                    Line::new(field(event, content)).bold(content == LineContent::Title);
                if event.all_day {
                    line2 = line2.time_display(TimeDisplay::None);
                }
                item = item.with_line2(line2);
            }
            if event.all_day {
                item = item.all_day();
            }
            item
        })
        .collect()
}

fn field(event: &CalendarEvent, content: LineContent) -> String {
    match content {
        LineContent::Title => event.title.clone(),
        LineContent::Location => event.location.clone().unwrap_or_default(),
    }
}

/// A data source backed by an in-memory calendar.
#[derive(Debug, Clone)]
pub struct CalendarSource {
    id: SourceId,
    config: CalendarConfig,
    events: Arc<RwLock<Vec<CalendarEvent>>>,
}

impl CalendarSource {
    /// Create a source publishing `events` under `id`.
    pub fn new(id: SourceId, config: CalendarConfig, events: Vec<CalendarEvent>) -> Self {
        Self {
            id,
            config,
            events: Arc::new(RwLock::new(events)),
        }
    }

    /// Replace the calendar contents. Takes effect on the next refresh.
    pub async fn replace_events(&self, events: Vec<CalendarEvent>) {
        *self.events.write().await = events;
    }

    /// The items this source would publish at `now`.
    pub async fn items(&self, now: DateTime<Utc>) -> Vec<AgendaItem> {
        let events = self.events.read().await;
        calendar_items(&self.id, &self.config, &events, now)
    }
}

#[async_trait]
impl DataSource for CalendarSource {
    fn id(&self) -> SourceId {
        self.id.clone()
    }

    async fn refresh(&self, publisher: Publisher) -> Result<(), ServiceError> {
        let items = self.items(Utc::now()).await;
        tracing::debug!(source = %self.id, items = items.len(), "calendar refreshed");
        publisher.publish(items, false).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use sync_types::Zone;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, day, hour, 0, 0).unwrap()
    }

    fn source() -> SourceId {
        SourceId::new("calendar").unwrap()
    }

    fn timed(calendar: &str, title: &str, start: u32, end: u32) -> CalendarEvent {
        CalendarEvent {
            calendar_id: calendar.into(),
            title: title.into(),
            location: Some("Room 2".into()),
            start: at(6, start),
            end: at(6, end),
            all_day: false,
        }
    }

    fn holiday() -> CalendarEvent {
        CalendarEvent {
            calendar_id: "holidays".into(),
            title: "Bank holiday".into(),
            location: None,
            start: at(6, 0),
            end: at(7, 0),
            all_day: true,
        }
    }

    #[test]
    fn timed_event_uses_title_then_location() {
        let items = calendar_items(
            &source(),
            &CalendarConfig::default(),
            &[timed("work", "Standup", 9, 10)],
            at(6, 8),
        );
        assert_eq!(items.len(), 1);
        let item = &items[0];
        assert_eq!(item.line1().text, "Standup");
        assert!(item.line1().bold);
        assert_eq!(item.line1().time_display, None);
        assert_eq!(item.line2().unwrap().text, "Room 2");
        assert!(!item.is_all_day());
        assert_eq!(item.source_id(), &source());
    }

    #[test]
    fn all_day_event_is_utc_without_time() {
        let items = calendar_items(&source(), &CalendarConfig::default(), &[holiday()], at(6, 8));
        let item = &items[0];
        assert!(item.is_all_day());
        assert_eq!(item.zone(), Some(Zone::Utc));
        assert_eq!(item.line1().time_display, Some(TimeDisplay::None));
        assert!(item.line2().is_none());
    }

    #[test]
    fn bold_follows_the_title_to_line_two() {
        let config = CalendarConfig {
            timed_layout: CalendarLayout {
                line1: LineContent::Location,
                line2: Some(LineContent::Title),
            },
            ..CalendarConfig::default()
        };
        let items = calendar_items(&source(), &config, &[timed("work", "Standup", 9, 10)], at(6, 8));
        assert_eq!(items[0].line1().text, "Room 2");
        assert!(!items[0].line1().bold);
        assert_eq!(items[0].line2().unwrap().text, "Standup");
        assert!(items[0].line2().unwrap().bold);
    }

    #[test]
    fn location_on_line_two_is_not_bold() {
        let items = calendar_items(
            &source(),
            &CalendarConfig::default(),
            &[timed("work", "Standup", 9, 10)],
            at(6, 8),
        );
        assert!(!items[0].line2().unwrap().bold);
    }

    fn days_from(now: DateTime<Utc>, days: i64, title: &str) -> CalendarEvent {
        let start = now + TimeDelta::days(days);
        CalendarEvent {
            calendar_id: "work".into(),
            title: title.into(),
            location: None,
            start,
            end: start + TimeDelta::hours(1),
            all_day: false,
        }
    }

    #[test]
    fn only_events_inside_the_window_are_published() {
        let now = at(6, 8);
        let mut stale_all_day = holiday();
        stale_all_day.start = now - TimeDelta::days(4);
        stale_all_day.end = now - TimeDelta::days(3);

        let events = vec![
            days_from(now, 3, "Soon"),
            days_from(now, 10, "Too far"),
            stale_all_day,
        ];
        let items = calendar_items(&source(), &CalendarConfig::default(), &events, now);
        let titles: Vec<_> = items.iter().map(|i| i.line1().text.as_str()).collect();
        assert_eq!(titles, vec!["Soon"]);

        let wide = CalendarConfig {
            lookahead_days: 14,
            ..CalendarConfig::default()
        };
        assert_eq!(calendar_items(&source(), &wide, &events, now).len(), 2);
    }

    #[test]
    fn keeps_the_earliest_events_up_to_the_cap() {
        let now = at(6, 8);
        let events: Vec<_> = (0..40)
            .rev()
            .map(|n| CalendarEvent {
                start: now + TimeDelta::minutes(n * 5),
                end: now + TimeDelta::minutes(n * 5 + 30),
                ..days_from(now, 0, &format!("event {}", n))
            })
            .collect();

        let items = calendar_items(&source(), &CalendarConfig::default(), &events, now);
        assert_eq!(items.len(), 30);
        assert_eq!(items[0].line1().text, "event 0");
        assert_eq!(items[29].line1().text, "event 29");
    }

    #[test]
    fn missing_location_is_empty_line() {
        let mut event = timed("work", "Standup", 9, 10);
        event.location = None;
        let items = calendar_items(&source(), &CalendarConfig::default(), &[event], at(6, 8));
        assert_eq!(items[0].line2().unwrap().text, "");
    }

    #[test]
    fn filters_excluded_all_day_and_past() {
        let config = CalendarConfig {
            show_all_day_events: false,
            excluded_calendars: vec!["private".into()],
            ..CalendarConfig::default()
        };
        let events = vec![
            timed("work", "Past", 6, 7),
            timed("private", "Secret", 10, 11),
            timed("work", "Review", 10, 11),
            holiday(),
        ];
        let items = calendar_items(&source(), &config, &events, at(6, 8));
        let titles: Vec<_> = items.iter().map(|i| i.line1().text.as_str()).collect();
        assert_eq!(titles, vec!["Review"]);
    }

    #[tokio::test]
    async fn replaced_events_show_on_next_read() {
        let source = CalendarSource::new(source(), CalendarConfig::default(), vec![]);
        assert!(source.items(at(6, 8)).await.is_empty());

        source.replace_events(vec![timed("work", "Lunch", 12, 13)]).await;
        assert_eq!(source.items(at(6, 8)).await.len(), 1);
    }
}
