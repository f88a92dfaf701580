//! Minute-of-day arithmetic for `HH:MM` clock strings.
//!
//! Windows and bookings store their times as [`ClockTime`], a minute offset
//! from midnight. Ranges are validated once at write time, and membership
//! checks are inclusive on both ends: a booking at exactly the window's end
//! minute still belongs to the window.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{BookingError, Result};

/// Number of minutes in a day; valid clock times are `0..MINUTES_PER_DAY`.
pub const MINUTES_PER_DAY: u16 = 24 * 60;

/// A wall-clock time of day with minute precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClockTime(u16);

impl ClockTime {
    /// Build from a minute offset, rejecting anything past 23:59.
    pub fn from_minutes(minutes: u16) -> Result<Self> {
        if minutes >= MINUTES_PER_DAY {
            return Err(BookingError::Format(format!(
                "{} minutes is past the end of the day",
                minutes
            )));
        }
        Ok(ClockTime(minutes))
    }

    /// Build from hour and minute components.
    pub fn from_hm(hour: u16, minute: u16) -> Result<Self> {
        if hour > 23 || minute > 59 {
            return Err(BookingError::Format(format!(
                "{:02}:{:02} is not a valid time of day",
                hour, minute
            )));
        }
        Ok(ClockTime(hour * 60 + minute))
    }

    /// Minutes since midnight.
    pub fn minutes(self) -> u16 {
        self.0
    }

    pub fn hour(self) -> u16 {
        self.0 / 60
    }

    pub fn minute(self) -> u16 {
        self.0 % 60
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for ClockTime {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self> {
        parse_time(s)
    }
}

impl TryFrom<String> for ClockTime {
    type Error = BookingError;

    fn try_from(value: String) -> Result<Self> {
        parse_time(&value)
    }
}

impl From<ClockTime> for String {
    fn from(value: ClockTime) -> Self {
        value.to_string()
    }
}

/// Parse a strict `HH:MM` string (two digits each, 00-23 and 00-59).
///
/// # Errors
/// Returns `BookingError::Format` for anything else, including `9:30`,
/// `09:30:00` and surrounding whitespace.
pub fn parse_time(s: &str) -> Result<ClockTime> {
    let bytes = s.as_bytes();
    let well_formed = bytes.len() == 5
        && bytes[2] == b':'
        && [0, 1, 3, 4].iter().all(|&i| bytes[i].is_ascii_digit());
    if !well_formed {
        return Err(BookingError::Format(format!(
            "'{}' is not a time in HH:MM format",
            s
        )));
    }

    let digit = |i: usize| u16::from(bytes[i] - b'0');
    let hour = digit(0) * 10 + digit(1);
    let minute = digit(3) * 10 + digit(4);
    ClockTime::from_hm(hour, minute)
        .map_err(|_| BookingError::Format(format!("'{}' is not a valid time of day", s)))
}

/// Parse both ends of a range and require `end > start`.
///
/// # Errors
/// Returns `BookingError::Format` if either end is malformed or the end does
/// not come strictly after the start.
pub fn validate_range(start: &str, end: &str) -> Result<(ClockTime, ClockTime)> {
    let start_time = parse_time(start)?;
    let end_time = parse_time(end)?;
    if end_time <= start_time {
        return Err(BookingError::Format(format!(
            "end time {} must be after start time {}",
            end_time, start_time
        )));
    }
    Ok((start_time, end_time))
}

/// Standard clamp of `value` into `[lo, hi]`. `lo` wins if the bounds cross.
pub fn clamp(value: i32, lo: i32, hi: i32) -> i32 {
    value.min(hi).max(lo)
}

/// Whether `point` lies in `[start, end]`, inclusive on both ends.
pub fn offset_within_range(point: ClockTime, start: ClockTime, end: ClockTime) -> bool {
    start <= point && point <= end
}

/// Render a minute offset as `HH:MM`.
pub fn format_time(minutes: u16) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}
