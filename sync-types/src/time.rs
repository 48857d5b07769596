//! Wire time format.
//!
//! The watch stores times as a single packed integer:
//!
//! ```text
//! minute + 60*hour + 1440*weekday + 10080*day_of_month
//!        + 322560*month0 + 3870720*(year - 1900)
//! ```
//!
//! where `weekday` counts from Monday = 0 and `month0` from January = 0.
//! The value is evaluated in the item's zone (local by default). All-day
//! entries are stored in UTC by calendar providers and must be encoded in UTC.
//! An absent instant encodes to `0`, meaning "no time bound".

use chrono::{DateTime, Datelike, FixedOffset, Local, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::CodecError;

const MINUTES_PER_HOUR: i64 = 60;
const MINUTES_PER_DAY: i64 = 60 * 24;
const MINUTES_PER_WEEK: i64 = MINUTES_PER_DAY * 7;
const MINUTES_PER_MONTH: i64 = MINUTES_PER_WEEK * 32;
const MINUTES_PER_YEAR: i64 = MINUTES_PER_MONTH * 12;

/// Timezone in which an item's start and end times are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Zone {
    /// The host's local zone.
    Local,
    /// Coordinated Universal Time.
    Utc,
    /// A fixed offset from UTC.
    Fixed(FixedOffset),
    /// A named IANA zone such as `Europe/Berlin`, daylight saving included.
    Named(Tz),
}

impl Zone {
    /// Parse a timezone id: `local`, `UTC` (also `Z`, `GMT`), a fixed
    /// offset such as `+02:00`, `-0530` or `UTC+01:00`, or an IANA name
    /// such as `America/New_York`.
    pub fn parse(id: &str) -> Result<Self, CodecError> {
        let trimmed = id.trim();
        let invalid = || CodecError::InvalidTimezone(id.to_string());
        if trimmed.is_empty() {
            return Err(invalid());
        }
        if trimmed.eq_ignore_ascii_case("local") {
            return Ok(Zone::Local);
        }
        if ["utc", "z", "gmt"]
            .iter()
            .any(|name| trimmed.eq_ignore_ascii_case(name))
        {
            return Ok(Zone::Utc);
        }

        let offset = trimmed
            .strip_prefix("UTC")
            .or_else(|| trimmed.strip_prefix("GMT"))
            .unwrap_or(trimmed);
        parse_offset(offset)
            .map(Zone::Fixed)
            .or_else(|| trimmed.parse::<Tz>().ok().map(Zone::Named))
            .ok_or_else(invalid)
    }
}

fn parse_offset(s: &str) -> Option<FixedOffset> {
    let (sign, rest) = match s.as_bytes().first()? {
        b'+' => (1, &s[1..]),
        b'-' => (-1, &s[1..]),
        _ => return None,
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 2 && digits.len() != 4 {
        return None;
    }
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = if digits.len() == 4 {
        digits[2..].parse().ok()?
    } else {
        0
    };
    if minutes >= 60 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

impl FromStr for Zone {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Zone {
    type Error = CodecError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Zone> for String {
    fn from(zone: Zone) -> Self {
        zone.to_string()
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Zone::Local => f.write_str("local"),
            Zone::Utc => f.write_str("UTC"),
            Zone::Fixed(offset) => write!(f, "{}", offset),
            Zone::Named(tz) => f.write_str(tz.name()),
        }
    }
}

/// Encode an instant into the wire time format.
///
/// `zone` of `None` means the host's local zone. `None` instants encode to `0`.
pub fn wire_time(instant: Option<DateTime<Utc>>, zone: Option<Zone>) -> i32 {
    let Some(instant) = instant else {
        return 0;
    };
    match zone.unwrap_or(Zone::Local) {
        Zone::Local => pack(&instant.with_timezone(&Local)),
        Zone::Utc => pack(&instant),
        Zone::Fixed(offset) => pack(&instant.with_timezone(&offset)),
        Zone::Named(tz) => pack(&instant.with_timezone(&tz)),
    }
}

/// Packed in 64 bits, then saturated: years past ~2454 (or before ~1345)
/// do not fit the watch's `i32` and pin to the end of the range.
fn pack<Z: TimeZone>(time: &DateTime<Z>) -> i32 {
    let packed = i64::from(time.minute())
        + MINUTES_PER_HOUR * i64::from(time.hour())
        + MINUTES_PER_DAY * i64::from(time.weekday().num_days_from_monday())
        + MINUTES_PER_WEEK * i64::from(time.day())
        + MINUTES_PER_MONTH * i64::from(time.month0())
        + MINUTES_PER_YEAR * (i64::from(time.year()) - 1900);
    i32::try_from(packed).unwrap_or(if packed < 0 { i32::MIN } else { i32::MAX })
}
