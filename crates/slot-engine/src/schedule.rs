//! Availability window management and the per-window availability view.
//!
//! Plain edits go through [`update_window`]. Edits that should carry already
//! booked patients along belong to [`crate::reschedule`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::access::Actor;
use crate::counter::count_active_in_window;
use crate::error::{BookingError, Result};
use crate::model::{AvailabilityWindow, WindowPayload};
use crate::projection::{day_index, next_occurrence, parse_weekday};
use crate::store::{ScheduleStore, Services};
use crate::time::validate_range;

/// Raw window fields as entered on a form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowDraft {
    pub day: String,
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub max_occupants: Option<u32>,
}

impl WindowDraft {
    pub fn new(day: &str, start: &str, end: &str, max_occupants: Option<u32>) -> Self {
        WindowDraft {
            day: day.to_string(),
            start: start.to_string(),
            end: end.to_string(),
            max_occupants,
        }
    }

    /// Validate the draft into a store payload for `doctor_id`.
    ///
    /// # Errors
    /// `BookingError::Format` for a bad weekday, malformed times or an end not
    /// after the start; `BookingError::Validation` for a blank doctor id.
    pub fn into_payload(self, doctor_id: &str) -> Result<WindowPayload> {
        if doctor_id.trim().is_empty() {
            return Err(BookingError::Validation(
                "a schedule window needs a doctor".to_string(),
            ));
        }
        let day_of_week = parse_weekday(&self.day)?;
        let (start_time, end_time) = validate_range(&self.start, &self.end)?;
        Ok(WindowPayload {
            doctor_id: doctor_id.to_string(),
            day_of_week,
            start_time,
            end_time,
            max_occupants: self.max_occupants,
        })
    }
}

/// One window as a booking screen shows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowAvailability {
    pub window: AvailabilityWindow,
    pub projected_date: NaiveDate,
    pub booked: usize,
    /// `None` when the window has no capacity limit.
    pub remaining: Option<u32>,
}

impl WindowAvailability {
    pub fn is_full(&self) -> bool {
        self.remaining == Some(0)
    }
}

pub fn create_window(
    services: Services<'_>,
    actor: &Actor,
    doctor_id: &str,
    draft: WindowDraft,
) -> Result<AvailabilityWindow> {
    actor.ensure_can_manage_windows(doctor_id)?;
    let payload = draft.into_payload(doctor_id)?;
    let window = services.schedules.create_window(payload)?;
    info!(window = %window.id, doctor = %window.doctor_id, "created schedule window {}", window);
    Ok(window)
}

/// Overwrite a window without touching its bookings.
pub fn update_window(
    services: Services<'_>,
    actor: &Actor,
    window_id: &str,
    draft: WindowDraft,
) -> Result<AvailabilityWindow> {
    let current = services.schedules.find_window(window_id)?;
    actor.ensure_can_manage_windows(&current.doctor_id)?;
    let payload = draft.into_payload(&current.doctor_id)?;
    let window = services.schedules.update_window(window_id, payload)?;
    info!(window = %window.id, "updated schedule window to {}", window);
    Ok(window)
}

pub fn delete_window(services: Services<'_>, actor: &Actor, window_id: &str) -> Result<()> {
    let current = services.schedules.find_window(window_id)?;
    actor.ensure_can_manage_windows(&current.doctor_id)?;
    services.schedules.delete_window(window_id)?;
    info!(window = %window_id, "deleted schedule window");
    Ok(())
}

/// A doctor's windows, Sunday first, then by start time.
pub fn windows_for_doctor(
    store: &dyn ScheduleStore,
    doctor_id: &str,
) -> Result<Vec<AvailabilityWindow>> {
    let mut windows = store.find_windows(doctor_id)?;
    windows.sort_by_key(|w| (day_index(w.day_of_week), w.start_time, w.end_time));
    Ok(windows)
}

/// Every window of a doctor with its next occurrence and remaining room.
pub fn list_availability(
    services: Services<'_>,
    doctor_id: &str,
    today: NaiveDate,
) -> Result<Vec<WindowAvailability>> {
    windows_for_doctor(services.schedules, doctor_id)?
        .into_iter()
        .map(|window| {
            let projected_date = next_occurrence(window.day_of_week, today);
            let booked = count_active_in_window(services.appointments, &window, projected_date)?;
            let remaining = window
                .capacity()
                .map(|max| max.saturating_sub(u32::try_from(booked).unwrap_or(u32::MAX)));
            Ok(WindowAvailability {
                window,
                projected_date,
                booked,
                remaining,
            })
        })
        .collect()
}
