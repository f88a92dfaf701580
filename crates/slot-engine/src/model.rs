//! Records exchanged with the backing store.
//!
//! Every reference to a doctor, patient or department is a plain string id.
//! Resolving populated records into ids is the collaborator's job, not ours.

use std::fmt;

use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::projection::{serde_weekday, weekday_name};
use crate::time::{offset_within_range, ClockTime};

/// One doctor's recurring weekly availability slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityWindow {
    /// Assigned by the store at creation; never changes.
    pub id: String,
    pub doctor_id: String,
    #[serde(with = "serde_weekday")]
    pub day_of_week: Weekday,
    pub start_time: ClockTime,
    pub end_time: ClockTime,
    /// Zero or absent means unlimited; read it through [`Self::capacity`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_occupants: Option<u32>,
}

impl AvailabilityWindow {
    /// Effective capacity, `None` when unlimited.
    pub fn capacity(&self) -> Option<u32> {
        self.max_occupants.filter(|&max| max > 0)
    }

    /// Whether `time` falls in `[start_time, end_time]`.
    pub fn contains(&self, time: ClockTime) -> bool {
        offset_within_range(time, self.start_time, self.end_time)
    }

    /// `"HH:MM - HH:MM"`.
    pub fn time_range(&self) -> String {
        format!("{} - {}", self.start_time, self.end_time)
    }

    /// The parts a reschedule compares to decide whether anything moved.
    pub fn shape(&self) -> (Weekday, ClockTime, ClockTime, Option<u32>) {
        (
            self.day_of_week,
            self.start_time,
            self.end_time,
            self.capacity(),
        )
    }
}

impl fmt::Display for AvailabilityWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}",
            weekday_name(self.day_of_week),
            self.time_range()
        )?;
        if let Some(max) = self.capacity() {
            write!(f, " (max {})", max)?;
        }
        Ok(())
    }
}

/// Lifecycle state of a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BookingStatus {
    Scheduled,
    Confirmed,
    Completed,
    Cancelled,
    NoShow,
}

impl BookingStatus {
    /// Only scheduled bookings hold a place in a window.
    pub fn is_active(self) -> bool {
        self == BookingStatus::Scheduled
    }
}

/// A patient's reservation with a doctor at a concrete date and time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    pub doctor_id: String,
    pub patient_id: String,
    pub department_id: String,
    pub date: NaiveDate,
    pub time: ClockTime,
    pub status: BookingStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Payload for creating a booking. New bookings always start `Scheduled`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBooking {
    pub doctor_id: String,
    pub patient_id: String,
    pub department_id: String,
    pub date: NaiveDate,
    pub time: ClockTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Partial update applied to an existing booking.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<ClockTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<BookingStatus>,
}

/// Filter for booking lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingCriteria {
    pub doctor_id: String,
    pub date: NaiveDate,
    pub status: BookingStatus,
}

impl BookingCriteria {
    /// Active bookings for a doctor on one date.
    pub fn active(doctor_id: &str, date: NaiveDate) -> Self {
        BookingCriteria {
            doctor_id: doctor_id.to_string(),
            date,
            status: BookingStatus::Scheduled,
        }
    }
}

/// Validated window fields, used for both create and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowPayload {
    pub doctor_id: String,
    #[serde(with = "serde_weekday")]
    pub day_of_week: Weekday,
    pub start_time: ClockTime,
    pub end_time: ClockTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_occupants: Option<u32>,
}

impl WindowPayload {
    /// The window this payload would produce under `id`.
    pub fn into_window(self, id: String) -> AvailabilityWindow {
        AvailabilityWindow {
            id,
            doctor_id: self.doctor_id,
            day_of_week: self.day_of_week,
            start_time: self.start_time,
            end_time: self.end_time,
            max_occupants: self.max_occupants,
        }
    }
}

/// Sent once per reschedule that moved at least one booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RescheduleNotice {
    pub window_id: String,
    pub old_window: AvailabilityWindow,
    pub new_window: AvailabilityWindow,
    pub booking_ids: Vec<String>,
}

/// Registration details for a patient booking for the first time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPatient {
    pub name: String,
    pub contact: String,
}
