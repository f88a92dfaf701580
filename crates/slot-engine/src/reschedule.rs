//! Reschedule propagation -- carry booked patients along when a window moves.
//!
//! Each affected booking keeps its offset from the window start, clamped so
//! it never lands outside the new window. Booking updates, the window edit
//! and the patient notification are independent: one failing does not stop
//! the others, and every outcome is reported in [`RescheduleOutcome`].
//!
//! Clamping can fold several bookings onto the same minute when the new
//! window is shorter than the old one. Such folds are reported as
//! [`Collision`]s and left for the store's slot constraint to arbitrate;
//! bookings are not spread out.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::access::Actor;
use crate::counter::active_in_window;
use crate::error::{BookingError, Result};
use crate::model::{AvailabilityWindow, BookingUpdate, RescheduleNotice, WindowPayload};
use crate::projection::next_occurrence;
use crate::schedule::WindowDraft;
use crate::store::Services;
use crate::time::{clamp, ClockTime};

/// Result of moving one booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum MigrationStatus {
    Updated,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Migration {
    pub booking_id: String,
    pub from_date: NaiveDate,
    pub from_time: ClockTime,
    pub to_date: NaiveDate,
    pub to_time: ClockTime,
    pub status: MigrationStatus,
}

/// Several affected bookings were assigned the same new time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collision {
    pub date: NaiveDate,
    pub time: ClockTime,
    pub booking_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "lowercase")]
pub enum WindowUpdate {
    Updated(AvailabilityWindow),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum NotificationStatus {
    Dispatched,
    Failed(String),
    /// Nothing was moved, so nobody needed telling.
    Skipped,
}

/// Everything a reschedule did, including the parts that failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RescheduleOutcome {
    pub previous: AvailabilityWindow,
    pub window: WindowUpdate,
    /// False when the request repeated the window's current day, times and
    /// capacity.
    pub changed: bool,
    pub migrations: Vec<Migration>,
    pub collisions: Vec<Collision>,
    pub notification: NotificationStatus,
}

impl RescheduleOutcome {
    pub fn window_updated(&self) -> bool {
        matches!(self.window, WindowUpdate::Updated(_))
    }

    pub fn updated_count(&self) -> usize {
        self.migrations
            .iter()
            .filter(|m| m.status == MigrationStatus::Updated)
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.migrations.len() - self.updated_count()
    }

    /// One-line message for the person who made the edit.
    pub fn summary(&self) -> String {
        let head = match &self.window {
            WindowUpdate::Updated(_) => "schedule updated".to_string(),
            WindowUpdate::Failed(reason) => format!("schedule update failed: {}", reason),
        };
        if !self.changed {
            return format!("{}; no changes to day, time or capacity", head);
        }
        if self.migrations.is_empty() {
            return match self.window {
                WindowUpdate::Updated(_) => "no appointments found for this schedule.".to_string(),
                WindowUpdate::Failed(_) => {
                    format!("{}; no appointments found for this schedule.", head)
                }
            };
        }

        let mut summary = format!(
            "{}; {} of {} appointments updated",
            head,
            self.updated_count(),
            self.migrations.len()
        );
        if let NotificationStatus::Failed(reason) = &self.notification {
            summary.push_str(&format!("; notifications failed: {}", reason));
        }
        summary
    }
}

impl fmt::Display for RescheduleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

/// New time for a booking at `time` in `old`, moved into `[new_start, new_end]`.
///
/// The booking's offset from the old start is preserved, then clamped.
pub fn migrated_time(
    time: ClockTime,
    old: &AvailabilityWindow,
    new_start: ClockTime,
    new_end: ClockTime,
) -> ClockTime {
    let offset = i32::from(time.minutes()) - i32::from(old.start_time.minutes());
    let raw = i32::from(new_start.minutes()) + offset;
    let clamped = clamp(
        raw,
        i32::from(new_start.minutes()),
        i32::from(new_end.minutes()),
    );
    // Both bounds are valid clock times, so the clamped value is too.
    u16::try_from(clamped)
        .ok()
        .and_then(|m| ClockTime::from_minutes(m).ok())
        .unwrap_or(new_start)
}

pub struct RescheduleEngine<'a> {
    services: Services<'a>,
}

impl<'a> RescheduleEngine<'a> {
    pub fn new(services: Services<'a>) -> Self {
        RescheduleEngine { services }
    }

    /// Edit window `window_id` to `draft` and move its upcoming bookings.
    ///
    /// # Errors
    /// Fails without writing anything when the window is missing, the actor
    /// may not edit it, the draft is malformed, or the affected bookings
    /// cannot be read. Later failures are recorded in the outcome instead.
    pub fn reschedule(
        &self,
        actor: &Actor,
        window_id: &str,
        draft: WindowDraft,
        today: NaiveDate,
    ) -> Result<RescheduleOutcome> {
        let old = self.services.schedules.find_window(window_id)?;
        actor.ensure_can_manage_windows(&old.doctor_id)?;
        let payload = draft.into_payload(&old.doctor_id)?;
        let proposed = payload.clone().into_window(old.id.clone());

        if proposed.shape() == old.shape() {
            let window = self.persist_window(window_id, payload);
            return Ok(RescheduleOutcome {
                previous: old,
                window,
                changed: false,
                migrations: Vec::new(),
                collisions: Vec::new(),
                notification: NotificationStatus::Skipped,
            });
        }

        let old_date = next_occurrence(old.day_of_week, today);
        let mut affected = active_in_window(self.services.appointments, &old, old_date)?;
        affected.sort_by(|a, b| a.time.cmp(&b.time).then_with(|| a.id.cmp(&b.id)));

        if affected.is_empty() {
            let window = self.persist_window(window_id, payload);
            info!(window = %window_id, "rescheduled window with no booked patients");
            return Ok(RescheduleOutcome {
                previous: old,
                window,
                changed: true,
                migrations: Vec::new(),
                collisions: Vec::new(),
                notification: NotificationStatus::Skipped,
            });
        }

        let new_date = next_occurrence(proposed.day_of_week, today);
        let mut planned: Vec<(String, ClockTime, ClockTime)> = affected
            .iter()
            .map(|b| {
                let to = migrated_time(b.time, &old, proposed.start_time, proposed.end_time);
                (b.id.clone(), b.time, to)
            })
            .collect();
        let collisions = find_collisions(&planned, new_date);
        for collision in &collisions {
            warn!(
                window = %window_id,
                time = %collision.time,
                bookings = ?collision.booking_ids,
                "rescheduled bookings share the same new time"
            );
        }

        // A same-day shift to later times moves the latest booking first so
        // nobody steps onto a minute a neighbour has not vacated yet.
        if new_date == old_date && proposed.start_time > old.start_time {
            planned.reverse();
        }
        let migrations: Vec<Migration> = planned
            .into_iter()
            .map(|(booking_id, from_time, to_time)| {
                self.migrate(booking_id, old_date, from_time, new_date, to_time)
            })
            .collect();

        let window = self.persist_window(window_id, payload);
        let new_window = match &window {
            WindowUpdate::Updated(w) => w.clone(),
            WindowUpdate::Failed(_) => proposed,
        };

        let notice = RescheduleNotice {
            window_id: window_id.to_string(),
            old_window: old.clone(),
            new_window,
            booking_ids: affected.into_iter().map(|b| b.id).collect(),
        };
        let notification = match self.services.notifier.notify_affected_patients(&notice) {
            Ok(()) => NotificationStatus::Dispatched,
            Err(err) => {
                warn!(window = %window_id, error = %err, "patient notification failed");
                NotificationStatus::Failed(reason(err))
            }
        };

        let outcome = RescheduleOutcome {
            previous: old,
            window,
            changed: true,
            migrations,
            collisions,
            notification,
        };
        info!(
            window = %window_id,
            updated = outcome.updated_count(),
            failed = outcome.failed_count(),
            "{}",
            outcome.summary()
        );
        Ok(outcome)
    }

    fn migrate(
        &self,
        booking_id: String,
        from_date: NaiveDate,
        from_time: ClockTime,
        to_date: NaiveDate,
        to_time: ClockTime,
    ) -> Migration {
        let update = BookingUpdate {
            date: Some(to_date),
            time: Some(to_time),
            status: None,
        };
        let status = match self.services.appointments.update_booking(&booking_id, &update) {
            Ok(_) => MigrationStatus::Updated,
            Err(err) => {
                warn!(booking = %booking_id, error = %err, "could not move booking");
                MigrationStatus::Failed(reason(err))
            }
        };
        Migration {
            booking_id,
            from_date,
            from_time,
            to_date,
            to_time,
            status,
        }
    }

    fn persist_window(&self, window_id: &str, payload: WindowPayload) -> WindowUpdate {
        match self.services.schedules.update_window(window_id, payload) {
            Ok(window) => WindowUpdate::Updated(window),
            Err(err) => {
                warn!(window = %window_id, error = %err, "could not save schedule window");
                WindowUpdate::Failed(reason(err))
            }
        }
    }
}

/// The message of an error without its category prefix.
fn reason(err: BookingError) -> String {
    match err {
        BookingError::Format(m)
        | BookingError::Validation(m)
        | BookingError::CapacityExceeded(m)
        | BookingError::SlotTaken(m)
        | BookingError::NotFound(m)
        | BookingError::Notification(m)
        | BookingError::Forbidden(m)
        | BookingError::Store(m) => m,
    }
}

fn find_collisions(planned: &[(String, ClockTime, ClockTime)], date: NaiveDate) -> Vec<Collision> {
    let mut by_time: BTreeMap<ClockTime, Vec<String>> = BTreeMap::new();
    for (id, _, to) in planned {
        by_time.entry(*to).or_default().push(id.clone());
    }
    by_time
        .into_iter()
        .filter(|(_, ids)| ids.len() > 1)
        .map(|(time, booking_ids)| Collision {
            date,
            time,
            booking_ids,
        })
        .collect()
}
