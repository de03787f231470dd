// libs/provider-cell/src/timeslot.rs
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

pub const MINUTES_PER_DAY: i32 = 24 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid time of day: expected 24-hour HH:MM")]
pub struct InvalidTimeOfDay;

/// Parse a 24-hour `HH:MM` string into minutes since midnight.
///
/// Accepts one or two hour digits (hours 0-23) and exactly two minute
/// digits (00-59). Anything else is an error - malformed input is never
/// coerced to midnight.
pub fn parse_time_of_day(s: &str) -> Result<i32, InvalidTimeOfDay> {
    let (hours_str, minutes_str) = s.split_once(':').ok_or(InvalidTimeOfDay)?;

    if hours_str.is_empty() || hours_str.len() > 2 || minutes_str.len() != 2 {
        return Err(InvalidTimeOfDay);
    }
    if !hours_str.bytes().all(|b| b.is_ascii_digit())
        || !minutes_str.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(InvalidTimeOfDay);
    }

    let hours: i32 = hours_str.parse().map_err(|_| InvalidTimeOfDay)?;
    let minutes: i32 = minutes_str.parse().map_err(|_| InvalidTimeOfDay)?;

    if hours > 23 || minutes > 59 {
        return Err(InvalidTimeOfDay);
    }

    Ok(hours * 60 + minutes)
}

/// Format minutes since midnight as zero-padded `HH:MM`.
///
/// Callers only pass values in `[0, MINUTES_PER_DAY)`.
pub fn format_minutes(minutes: i32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

/// A half-open interval `[start, end)` is valid iff the end is strictly
/// after the start.
pub fn is_valid_range(start_minutes: i32, end_minutes: i32) -> bool {
    end_minutes > start_minutes
}

/// Half-open interval intersection: `[s1, e1)` and `[s2, e2)` overlap iff
/// `s1 < e2 && s2 < e1`.
pub fn intervals_overlap(s1: i32, e1: i32, s2: i32, e2: i32) -> bool {
    s1 < e2 && s2 < e1
}

/// A time of day with minute resolution, carried as `HH:MM` on the wire
/// and as minutes since midnight internally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(i32);

impl TimeOfDay {
    pub fn from_minutes(minutes: i32) -> Option<Self> {
        if (0..MINUTES_PER_DAY).contains(&minutes) {
            Some(Self(minutes))
        } else {
            None
        }
    }

    pub fn minutes(self) -> i32 {
        self.0
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_minutes(self.0))
    }
}

impl FromStr for TimeOfDay {
    type Err = InvalidTimeOfDay;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_time_of_day(s).map(TimeOfDay)
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
