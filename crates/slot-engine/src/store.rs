//! Collaborator boundary and an in-memory reference store.
//!
//! The engines only talk to the outside world through the traits below. How
//! a real deployment backs them (REST, SQL, in-process) is out of scope;
//! [`MemoryStore`] implements the store traits over a single mutex-guarded
//! [`ClinicState`] and is what the CLI and the test-suite run against.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{BookingError, Result};
use crate::model::{
    AvailabilityWindow, Booking, BookingCriteria, BookingStatus, BookingUpdate, NewBooking,
    NewPatient, RescheduleNotice, WindowPayload,
};
use crate::time::ClockTime;

/// Booking persistence.
pub trait AppointmentStore: Send + Sync {
    fn find_bookings(&self, criteria: &BookingCriteria) -> Result<Vec<Booking>>;

    /// # Errors
    /// `BookingError::NotFound` when no booking has this id.
    fn find_booking(&self, id: &str) -> Result<Booking>;

    /// # Errors
    /// `BookingError::Validation` when a store-side constraint (such as the
    /// unique doctor/date/time of active bookings) rejects the payload.
    fn create_booking(&self, payload: NewBooking) -> Result<Booking>;

    fn update_booking(&self, id: &str, fields: &BookingUpdate) -> Result<Booking>;
}

/// Availability window persistence.
pub trait ScheduleStore: Send + Sync {
    fn find_windows(&self, doctor_id: &str) -> Result<Vec<AvailabilityWindow>>;

    /// # Errors
    /// `BookingError::NotFound` when no window has this id.
    fn find_window(&self, id: &str) -> Result<AvailabilityWindow>;

    fn create_window(&self, payload: WindowPayload) -> Result<AvailabilityWindow>;

    fn update_window(&self, id: &str, payload: WindowPayload) -> Result<AvailabilityWindow>;

    fn delete_window(&self, id: &str) -> Result<()>;
}

/// People records owned outside the booking core.
pub trait Directory: Send + Sync {
    /// Display name for error messages; `None` when unknown.
    fn doctor_name(&self, doctor_id: &str) -> Result<Option<String>>;

    /// Create a patient record and return its id.
    fn register_patient(&self, patient: NewPatient) -> Result<String>;

    /// Drop a patient record created by [`register_patient`] whose booking
    /// never landed. Unknown ids are ignored.
    ///
    /// [`register_patient`]: Directory::register_patient
    fn forget_patient(&self, patient_id: &str) -> Result<()>;
}

/// Best-effort outbound messages. Failures are logged by the caller and
/// never undo the write that triggered them.
pub trait Notifier: Send + Sync {
    fn notify_doctor(&self, booking: &Booking) -> Result<()>;

    fn notify_affected_patients(&self, notice: &RescheduleNotice) -> Result<()>;
}

/// The collaborators one engine call needs, bundled by reference.
#[derive(Clone, Copy)]
pub struct Services<'a> {
    pub appointments: &'a dyn AppointmentStore,
    pub schedules: &'a dyn ScheduleStore,
    pub directory: &'a dyn Directory,
    pub notifier: &'a dyn Notifier,
}

impl Services<'_> {
    /// Doctor display name, falling back to the raw id.
    pub fn doctor_label(&self, doctor_id: &str) -> Result<String> {
        Ok(self
            .directory
            .doctor_name(doctor_id)?
            .unwrap_or_else(|| doctor_id.to_string()))
    }
}

/// Everything [`MemoryStore`] holds; also the CLI's on-disk state format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicState {
    /// Doctor id to display name.
    #[serde(default)]
    pub doctors: BTreeMap<String, String>,
    #[serde(default)]
    pub patients: BTreeMap<String, NewPatient>,
    #[serde(default)]
    pub windows: Vec<AvailabilityWindow>,
    #[serde(default)]
    pub bookings: Vec<Booking>,
    /// Last id handed out; ids are `<prefix>-<n>`.
    #[serde(default)]
    pub last_id: u64,
}

impl ClinicState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.last_id += 1;
        format!("{}-{}", prefix, self.last_id)
    }

    /// An active booking other than `exclude` already holding this slot.
    fn slot_holder(
        &self,
        doctor_id: &str,
        date: NaiveDate,
        time: ClockTime,
        exclude: Option<&str>,
    ) -> Option<&Booking> {
        self.bookings.iter().find(|b| {
            b.status.is_active()
                && b.doctor_id == doctor_id
                && b.date == date
                && b.time == time
                && Some(b.id.as_str()) != exclude
        })
    }
}

/// Thread-safe in-memory implementation of the store traits.
///
/// Enforces the unique `(doctor, date, time)` constraint on active bookings
/// inside a single lock, so concurrent creates for the same slot admit at
/// most one.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<ClinicState>,
}

impl MemoryStore {
    pub fn new(state: ClinicState) -> Self {
        MemoryStore {
            state: Mutex::new(state),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(MemoryStore::new(serde_json::from_str(json)?))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&*self.lock()?)?)
    }

    /// A copy of the current state.
    pub fn snapshot(&self) -> Result<ClinicState> {
        Ok(self.lock()?.clone())
    }

    pub fn add_doctor(&self, id: &str, name: &str) -> Result<()> {
        self.lock()?
            .doctors
            .insert(id.to_string(), name.to_string());
        Ok(())
    }

    /// Insert a booking verbatim, bypassing the slot constraint. For seeding.
    pub fn insert_booking(&self, booking: Booking) -> Result<()> {
        self.lock()?.bookings.push(booking);
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, ClinicState>> {
        self.state
            .lock()
            .map_err(|_| BookingError::Store("clinic state lock poisoned".to_string()))
    }
}

impl AppointmentStore for MemoryStore {
    fn find_bookings(&self, criteria: &BookingCriteria) -> Result<Vec<Booking>> {
        let state = self.lock()?;
        Ok(state
            .bookings
            .iter()
            .filter(|b| {
                b.doctor_id == criteria.doctor_id
                    && b.date == criteria.date
                    && b.status == criteria.status
            })
            .cloned()
            .collect())
    }

    fn find_booking(&self, id: &str) -> Result<Booking> {
        let state = self.lock()?;
        state
            .bookings
            .iter()
            .find(|b| b.id == id)
            .cloned()
            .ok_or_else(|| BookingError::NotFound(format!("booking {}", id)))
    }

    fn create_booking(&self, payload: NewBooking) -> Result<Booking> {
        let mut state = self.lock()?;
        let holder = state.slot_holder(&payload.doctor_id, payload.date, payload.time, None);
        if let Some(holder) = holder {
            return Err(BookingError::Validation(format!(
                "slot {} {} for doctor {} is already held by booking {}",
                payload.date, payload.time, payload.doctor_id, holder.id
            )));
        }

        let booking = Booking {
            id: state.next_id("b"),
            doctor_id: payload.doctor_id,
            patient_id: payload.patient_id,
            department_id: payload.department_id,
            date: payload.date,
            time: payload.time,
            status: BookingStatus::Scheduled,
            reason: payload.reason,
        };
        state.bookings.push(booking.clone());
        Ok(booking)
    }

    fn update_booking(&self, id: &str, fields: &BookingUpdate) -> Result<Booking> {
        let mut state = self.lock()?;
        let index = state
            .bookings
            .iter()
            .position(|b| b.id == id)
            .ok_or_else(|| BookingError::NotFound(format!("booking {}", id)))?;

        let mut updated = state.bookings[index].clone();
        if let Some(date) = fields.date {
            updated.date = date;
        }
        if let Some(time) = fields.time {
            updated.time = time;
        }
        if let Some(status) = fields.status {
            updated.status = status;
        }

        if updated.status.is_active() {
            if let Some(holder) =
                state.slot_holder(&updated.doctor_id, updated.date, updated.time, Some(id))
            {
                return Err(BookingError::Validation(format!(
                    "slot {} {} for doctor {} is already held by booking {}",
                    updated.date, updated.time, updated.doctor_id, holder.id
                )));
            }
        }

        state.bookings[index] = updated.clone();
        Ok(updated)
    }
}

impl ScheduleStore for MemoryStore {
    fn find_windows(&self, doctor_id: &str) -> Result<Vec<AvailabilityWindow>> {
        let state = self.lock()?;
        Ok(state
            .windows
            .iter()
            .filter(|w| w.doctor_id == doctor_id)
            .cloned()
            .collect())
    }

    fn find_window(&self, id: &str) -> Result<AvailabilityWindow> {
        let state = self.lock()?;
        state
            .windows
            .iter()
            .find(|w| w.id == id)
            .cloned()
            .ok_or_else(|| BookingError::NotFound(format!("schedule window {}", id)))
    }

    fn create_window(&self, payload: WindowPayload) -> Result<AvailabilityWindow> {
        let mut state = self.lock()?;
        let window = payload.into_window(state.next_id("w"));
        state.windows.push(window.clone());
        Ok(window)
    }

    fn update_window(&self, id: &str, payload: WindowPayload) -> Result<AvailabilityWindow> {
        let mut state = self.lock()?;
        let slot = state
            .windows
            .iter_mut()
            .find(|w| w.id == id)
            .ok_or_else(|| BookingError::NotFound(format!("schedule window {}", id)))?;
        *slot = payload.into_window(id.to_string());
        Ok(slot.clone())
    }

    fn delete_window(&self, id: &str) -> Result<()> {
        let mut state = self.lock()?;
        let before = state.windows.len();
        state.windows.retain(|w| w.id != id);
        if state.windows.len() == before {
            return Err(BookingError::NotFound(format!("schedule window {}", id)));
        }
        Ok(())
    }
}

impl Directory for MemoryStore {
    fn doctor_name(&self, doctor_id: &str) -> Result<Option<String>> {
        Ok(self.lock()?.doctors.get(doctor_id).cloned())
    }

    fn register_patient(&self, patient: NewPatient) -> Result<String> {
        let mut state = self.lock()?;
        let id = state.next_id("p");
        state.patients.insert(id.clone(), patient);
        Ok(id)
    }

    fn forget_patient(&self, patient_id: &str) -> Result<()> {
        self.lock()?.patients.remove(patient_id);
        Ok(())
    }
}
