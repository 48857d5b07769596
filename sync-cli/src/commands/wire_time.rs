//! Encode an instant in the watch time format.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sync_types::{wire_time, Zone};

/// Run the wire-time command.
pub fn run(instant: &str, tz: &str) -> Result<()> {
    let value = encode(instant, tz)?;
    println!("{}", value);
    Ok(())
}

fn encode(instant: &str, tz: &str) -> Result<i32> {
    let instant = DateTime::parse_from_rfc3339(instant)
        .with_context(|| format!("invalid RFC 3339 instant: {}", instant))?
        .with_timezone(&Utc);
    let zone = Zone::parse(tz)?;
    Ok(wire_time(Some(instant), Some(zone)))
}
