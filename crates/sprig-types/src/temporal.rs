use std::fmt;
use std::str::FromStr;

use chrono::{Local, Offset};

use crate::error::TypeError;

/// Largest zone offset expressible as `±HHMM`.
const MAX_OFFSET_MINUTES: i32 = 99 * 60 + 59;

/// Commit timestamp: seconds since the UNIX epoch plus the zone offset that
/// was in effect where the commit was made.
///
/// Serialized as `<seconds> <±HHMM>`, e.g. `1700000000 +0130`. Seconds
/// before the epoch carry a leading `-`.
///
/// A `-0000` zone parses to an offset of zero and renders back as `+0000`,
/// so re-encoding a decoded commit that used `-0000` yields different bytes.
/// Stored records keep their original bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Timestamp {
    /// Seconds since the UNIX epoch (UTC).
    pub seconds: i64,
    /// Offset of local time from UTC, in minutes.
    pub offset_minutes: i32,
}

impl Timestamp {
    /// Create a timestamp with explicit values.
    pub fn new(seconds: i64, offset_minutes: i32) -> Result<Self, TypeError> {
        if offset_minutes.abs() > MAX_OFFSET_MINUTES {
            return Err(TypeError::InvalidTimestamp(format!(
                "zone offset {offset_minutes} minutes out of range"
            )));
        }
        Ok(Self {
            seconds,
            offset_minutes,
        })
    }

    /// The current wall-clock time with the local zone offset.
    pub fn now() -> Self {
        let now = Local::now();
        Self {
            seconds: now.timestamp(),
            offset_minutes: now.offset().fix().local_minus_utc() / 60,
        }
    }

    /// The zone offset formatted as `±HHMM`.
    pub fn offset_string(&self) -> String {
        let sign = if self.offset_minutes < 0 { '-' } else { '+' };
        let abs = self.offset_minutes.abs();
        format!("{sign}{:02}{:02}", abs / 60, abs % 60)
    }

    /// Parse a `±HHMM` zone offset into minutes.
    pub fn parse_offset(s: &str) -> Result<i32, TypeError> {
        let invalid = || TypeError::InvalidTimestamp(s.to_string());
        let bytes = s.as_bytes();
        if bytes.len() != 5 || !bytes[1..].iter().all(u8::is_ascii_digit) {
            return Err(invalid());
        }
        let sign = match bytes[0] {
            b'+' => 1,
            b'-' => -1,
            _ => return Err(invalid()),
        };
        let hours: i32 = s[1..3].parse().map_err(|_| invalid())?;
        let minutes: i32 = s[3..5].parse().map_err(|_| invalid())?;
        if minutes >= 60 {
            return Err(invalid());
        }
        Ok(sign * (hours * 60 + minutes))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.seconds, self.offset_string())
    }
}

impl FromStr for Timestamp {
    type Err = TypeError;

    /// Parse `<seconds> <±HHMM>`. Seconds may be negative.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TypeError::InvalidTimestamp(s.to_string());
        let (secs, zone) = s.split_once(' ').ok_or_else(invalid)?;
        let digits = secs.strip_prefix('-').unwrap_or(secs);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let seconds = secs.parse().map_err(|_| invalid())?;
        Self::new(seconds, Self::parse_offset(zone)?)
    }
}
