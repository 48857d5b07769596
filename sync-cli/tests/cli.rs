//! CLI integration tests.
//!
//! Each test writes a config and an items file into a temporary directory
//! and runs the `agenda-sync` binary against them.

use assert_cmd::Command;
use chrono::{Days, TimeDelta, Utc};
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

// ============================================================================
// Test Utilities
// ============================================================================

/// Short timings so a simulated sync finishes in well under a second.
const FAST_CONFIG: &str = r#"
[engine]
initial_data_wait_ms = 50
resend_delay_ms = 50
"#;

const ITEMS: &str = r#"{
  "items": [
    {
      "line1": { "text": "Lunch with the team" },
      "line2": { "text": "Cafeteria, second floor, by the window seats" },
      "start": "2099-01-05T12:00:00Z",
      "end": "2099-01-05T13:00:00Z",
      "source_id": "tasks"
    },
    {
      "line1": { "text": "Standup", "bold": true },
      "start": "2099-01-05T09:00:00Z",
      "end": "2099-01-05T09:15:00Z",
      "source_id": "tasks"
    }
  ]
}"#;

const EVENTS: &str = r#"{
  "events": [
    {
      "calendar_id": "work",
      "title": "Review",
      "location": "Room 4",
      "start": "2099-01-05T15:00:00Z",
      "end": "2099-01-05T16:00:00Z"
    },
    {
      "calendar_id": "home",
      "title": "Holiday",
      "start": "2099-01-06T00:00:00Z",
      "end": "2099-01-07T00:00:00Z",
      "all_day": true
    }
  ]
}"#;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new(config: &str) -> Self {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("agenda.toml"), config).unwrap();
        Self { dir }
    }

    fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    /// Command running inside the workspace, so `agenda.toml` is picked up.
    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("agenda-sync").expect("Failed to find agenda-sync binary");
        cmd.current_dir(self.dir.path()).env_remove("RUST_LOG");
        cmd
    }
}

// ============================================================================
// General
// ============================================================================

#[test]
fn help_lists_commands() {
    let ws = Workspace::new("");
    ws.cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("simulate"))
        .stdout(predicate::str::contains("preview"))
        .stdout(predicate::str::contains("wire-time"));
}

#[test]
fn invalid_config_is_reported() {
    let ws = Workspace::new("[engine]\nmax_items = \"many\"\n");
    ws.cmd()
        .args(["wire-time", "2024-03-05T14:30:00Z", "--tz", "UTC"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to parse config file"));
}

// ============================================================================
// wire-time
// ============================================================================

#[test]
fn wire_time_encodes_utc_instant() {
    let ws = Workspace::new("");
    // 30 + 60*14 + 1440*1 + 10080*5 + 322560*2 + 3870720*124
    ws.cmd()
        .args(["wire-time", "2024-03-05T14:30:00Z", "--tz", "UTC"])
        .assert()
        .success()
        .stdout("480667110\n");
}

#[test]
fn wire_time_rejects_unknown_zone() {
    let ws = Workspace::new("");
    ws.cmd()
        .args(["wire-time", "2024-03-05T14:30:00Z", "--tz", "Mars/Olympus"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid timezone id"));
}

// ============================================================================
// preview
// ============================================================================

#[test]
fn preview_orders_and_annotates_items() {
    let ws = Workspace::new(FAST_CONFIG);
    let items = ws.write("items.json", ITEMS);

    let output = ws
        .cmd()
        .args(["preview", "--now", "2099-01-05T08:00:00Z", "--items"])
        .arg(&items)
        .assert()
        .success()
        .stdout(predicate::str::contains("2 item(s)"))
        .get_output()
        .stdout
        .clone();

    let stdout = String::from_utf8(output).unwrap();
    let standup = stdout.find("Standup").unwrap();
    let lunch = stdout.find("Lunch with the team").unwrap();
    assert!(standup < lunch, "items out of order:\n{}", stdout);
    assert!(stdout.contains("[0] single"));
    assert!(stdout.contains("[1] split"));
}

#[test]
fn preview_drops_expired_items() {
    let ws = Workspace::new(FAST_CONFIG);
    let items = ws.write("items.json", ITEMS);

    ws.cmd()
        .args(["preview", "--now", "2099-01-05T10:00:00Z", "--items"])
        .arg(&items)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 item(s)"))
        .stdout(predicate::str::contains("Standup").not());
}

#[test]
fn preview_applies_calendar_preferences() {
    let ws = Workspace::new("[calendar]\nshow_all_day_events = false\n");
    let events = ws.write("events.json", EVENTS);

    ws.cmd()
        .args(["preview", "--now", "2099-01-05T08:00:00Z", "--items"])
        .arg(&events)
        .assert()
        .success()
        .stdout(predicate::str::contains("source=calendar | Review | Room 4"))
        .stdout(predicate::str::contains("Holiday").not());
}

#[test]
fn preview_keeps_valid_items_next_to_a_bad_one() {
    let ws = Workspace::new("");
    let items = ws.write(
        "items.json",
        r#"{ "items": [
            { "line1": { "text": "Good" }, "source_id": "tasks" },
            { "line1": { "text": "Bad" }, "source_id": "" }
        ] }"#,
    );

    ws.cmd()
        .args(["preview", "--items"])
        .arg(&items)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 item(s)"))
        .stdout(predicate::str::contains("Good"))
        .stdout(predicate::str::contains("Bad").not())
        .stderr(predicate::str::contains("skipping invalid entry"));
}

#[test]
fn preview_reports_missing_file() {
    let ws = Workspace::new("");
    ws.cmd()
        .args(["preview", "--items", "nope.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read items file"));
}

// ============================================================================
// simulate
// ============================================================================

#[test]
fn simulate_delivers_full_dataset() {
    let ws = Workspace::new(FAST_CONFIG);
    let items = ws.write("items.json", ITEMS);

    ws.cmd()
        .args(["simulate", "--items"])
        .arg(&items)
        .assert()
        .success()
        .stdout(predicate::str::contains("force-request"))
        .stdout(predicate::str::contains("<- request version=9 last_sync_id=0"))
        .stdout(predicate::str::contains("init items=2 sync_id=1"))
        .stdout(predicate::str::contains("item-half-2[1]"))
        .stdout(predicate::str::contains("Sync complete: 2 item(s), sync id 1"))
        .stdout(predicate::str::contains("Watch version: 9"));
}

#[test]
fn simulate_recovers_from_nacks() {
    let ws = Workspace::new(FAST_CONFIG);
    let items = ws.write("items.json", ITEMS);

    ws.cmd()
        .args(["simulate", "--nack-every", "3", "--items"])
        .arg(&items)
        .assert()
        .success()
        .stdout(predicate::str::contains("nack"))
        .stdout(predicate::str::contains("Sync complete: 2 item(s)"));
}

#[test]
fn simulate_recovers_from_lost_ack() {
    let ws = Workspace::new(FAST_CONFIG);
    let items = ws.write("items.json", ITEMS);

    ws.cmd()
        .args(["simulate", "--drop-ack", "--items"])
        .arg(&items)
        .assert()
        .success()
        .stdout(predicate::str::contains("(ack lost)"))
        .stdout(predicate::str::contains("Sync complete: 2 item(s)"));
}

#[test]
fn simulate_syncs_calendar_events() {
    let ws = Workspace::new(FAST_CONFIG);
    // the calendar only publishes the coming week, so place events near now
    let now = Utc::now();
    let hours = |h: i64| (now + TimeDelta::hours(h)).to_rfc3339();
    let tomorrow = (now + TimeDelta::days(1)).date_naive();
    let events = ws.write(
        "events.json",
        &format!(
            r#"{{ "events": [
                {{ "calendar_id": "work", "title": "Review", "start": "{}", "end": "{}" }},
                {{ "calendar_id": "home", "title": "Holiday", "all_day": true,
                   "start": "{}T00:00:00Z", "end": "{}T00:00:00Z" }},
                {{ "calendar_id": "work", "title": "Next month", "start": "{}", "end": "{}" }}
            ] }}"#,
            hours(2),
            hours(3),
            tomorrow,
            tomorrow + Days::new(1),
            hours(24 * 30),
            hours(24 * 30 + 1),
        ),
    );

    ws.cmd()
        .args(["simulate", "--items"])
        .arg(&events)
        .assert()
        .success()
        .stdout(predicate::str::contains("Sync complete: 2 item(s)"))
        .stdout(predicate::str::contains("Holiday"))
        .stdout(predicate::str::contains("Next month").not());
}

#[test]
fn simulate_withholds_data_from_outdated_watch() {
    let ws = Workspace::new(FAST_CONFIG);
    let items = ws.write("items.json", ITEMS);

    ws.cmd()
        .args(["simulate", "--watch-version", "3", "--timeout-secs", "1", "--items"])
        .arg(&items)
        .assert()
        .failure()
        .stdout(predicate::str::contains("init").not())
        .stderr(predicate::str::contains("no dataset delivered"));
}
