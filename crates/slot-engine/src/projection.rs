//! Weekday projection -- maps a recurring weekday onto its next concrete date.
//!
//! A window recurs every week, a booking happens on one date. Projection is a
//! pure function of `(weekday, today)` and is recomputed on every request; the
//! result is never stored.

use chrono::{Datelike, Duration, NaiveDate, Weekday};

use crate::error::{BookingError, Result};

/// Full English weekday name, Sunday first to match [`day_index`].
pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Sun => "Sunday",
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
    }
}

/// Parse a weekday from its full English name or three-letter abbreviation,
/// case-insensitively.
///
/// # Errors
/// Returns `BookingError::Format` for anything else.
pub fn parse_weekday(s: &str) -> Result<Weekday> {
    match s.trim().to_ascii_lowercase().as_str() {
        "sunday" | "sun" => Ok(Weekday::Sun),
        "monday" | "mon" => Ok(Weekday::Mon),
        "tuesday" | "tue" => Ok(Weekday::Tue),
        "wednesday" | "wed" => Ok(Weekday::Wed),
        "thursday" | "thu" => Ok(Weekday::Thu),
        "friday" | "fri" => Ok(Weekday::Fri),
        "saturday" | "sat" => Ok(Weekday::Sat),
        _ => Err(BookingError::Format(format!(
            "'{}' is not a day of the week",
            s
        ))),
    }
}

/// Index of a weekday with Sunday = 0 through Saturday = 6.
pub fn day_index(day: Weekday) -> i64 {
    i64::from(day.num_days_from_sunday())
}

/// The next date strictly after `today` that falls on `day`.
///
/// When `day` is today's weekday the projection lands one full week out,
/// never on `today` itself, so the result is always 1..=7 days ahead.
pub fn next_occurrence(day: Weekday, today: NaiveDate) -> NaiveDate {
    let mut delta = day_index(day) - day_index(today.weekday());
    if delta <= 0 {
        delta += 7;
    }
    today + Duration::days(delta)
}

/// Human-facing date used in error messages, e.g. `Mon, 19 Oct 2026`.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%a, %d %b %Y").to_string()
}

/// Parse an ISO `YYYY-MM-DD` date.
///
/// # Errors
/// Returns `BookingError::Format` for anything else.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| BookingError::Format(format!("'{}' is not a date in YYYY-MM-DD format", s)))
}

/// Serde adapter storing a [`Weekday`] as its full English name.
pub mod serde_weekday {
    use chrono::Weekday;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(day: &Weekday, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(super::weekday_name(*day))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Weekday, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_weekday(&raw).map_err(serde::de::Error::custom)
    }
}
