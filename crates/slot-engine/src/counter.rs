//! Count the active bookings that occupy one occurrence of a window.
//!
//! Always queries the store; bookings change between requests, so a count is
//! only good for the request that computed it.

use chrono::NaiveDate;
use tracing::debug;

use crate::error::Result;
use crate::model::{AvailabilityWindow, Booking, BookingCriteria};
use crate::store::AppointmentStore;

/// Active bookings for the window's doctor on `date` whose time lies inside
/// the window, inclusive of both ends.
pub fn active_in_window(
    store: &dyn AppointmentStore,
    window: &AvailabilityWindow,
    date: NaiveDate,
) -> Result<Vec<Booking>> {
    let bookings = store.find_bookings(&BookingCriteria::active(&window.doctor_id, date))?;
    Ok(bookings
        .into_iter()
        .filter(|b| b.status.is_active() && window.contains(b.time))
        .collect())
}

/// Number of active bookings inside `window` on `date`.
pub fn count_active_in_window(
    store: &dyn AppointmentStore,
    window: &AvailabilityWindow,
    date: NaiveDate,
) -> Result<usize> {
    let count = active_in_window(store, window, date)?.len();
    debug!(window = %window.id, %date, count, "counted active bookings");
    Ok(count)
}
