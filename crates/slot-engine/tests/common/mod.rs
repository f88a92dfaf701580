//! Shared fixtures for slot-engine integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Mutex;

use chrono::NaiveDate;
use slot_engine::error::{BookingError, Result};
use slot_engine::model::{
    AvailabilityWindow, Booking, BookingCriteria, BookingStatus, BookingUpdate, NewBooking,
    NewPatient, RescheduleNotice, WindowPayload,
};
use slot_engine::store::{AppointmentStore, Directory, MemoryStore, Notifier, ScheduleStore};
use slot_engine::{BookingRequest, BookingTarget, PatientRef, Services, WindowDraft};

/// Friday. Monday projects to 2026-10-19, Tuesday to 2026-10-20.
pub fn today() -> NaiveDate {
    date("2026-10-16")
}

pub fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

/// Records every notification and optionally fails them all.
#[derive(Default)]
pub struct RecordingNotifier {
    pub doctor_pings: Mutex<Vec<String>>,
    pub notices: Mutex<Vec<RescheduleNotice>>,
    pub fail_with: Option<String>,
}

impl RecordingNotifier {
    pub fn failing(reason: &str) -> Self {
        RecordingNotifier {
            fail_with: Some(reason.to_string()),
            ..Default::default()
        }
    }

    pub fn notice_count(&self) -> usize {
        self.notices.lock().unwrap().len()
    }
}

impl Notifier for RecordingNotifier {
    fn notify_doctor(&self, booking: &Booking) -> Result<()> {
        self.doctor_pings.lock().unwrap().push(booking.id.clone());
        match &self.fail_with {
            Some(reason) => Err(BookingError::Notification(reason.clone())),
            None => Ok(()),
        }
    }

    fn notify_affected_patients(&self, notice: &RescheduleNotice) -> Result<()> {
        self.notices.lock().unwrap().push(notice.clone());
        match &self.fail_with {
            Some(reason) => Err(BookingError::Notification(reason.clone())),
            None => Ok(()),
        }
    }
}

/// A [`MemoryStore`] whose updates fail for selected booking ids, and whose
/// booking creates and window writes can be switched off.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub failing_bookings: HashSet<String>,
    pub fail_creates: bool,
    pub fail_window_writes: bool,
}

impl AppointmentStore for FlakyStore {
    fn find_bookings(&self, criteria: &BookingCriteria) -> Result<Vec<Booking>> {
        self.inner.find_bookings(criteria)
    }

    fn find_booking(&self, id: &str) -> Result<Booking> {
        self.inner.find_booking(id)
    }

    fn create_booking(&self, payload: NewBooking) -> Result<Booking> {
        if self.fail_creates {
            return Err(BookingError::Validation(format!(
                "slot {} {} for doctor {} is already held",
                payload.date, payload.time, payload.doctor_id
            )));
        }
        self.inner.create_booking(payload)
    }

    fn update_booking(&self, id: &str, fields: &BookingUpdate) -> Result<Booking> {
        if self.failing_bookings.contains(id) {
            return Err(BookingError::Store(format!("timeout updating {}", id)));
        }
        self.inner.update_booking(id, fields)
    }
}

impl ScheduleStore for FlakyStore {
    fn find_windows(&self, doctor_id: &str) -> Result<Vec<AvailabilityWindow>> {
        self.inner.find_windows(doctor_id)
    }

    fn find_window(&self, id: &str) -> Result<AvailabilityWindow> {
        self.inner.find_window(id)
    }

    fn create_window(&self, payload: WindowPayload) -> Result<AvailabilityWindow> {
        self.inner.create_window(payload)
    }

    fn update_window(&self, id: &str, payload: WindowPayload) -> Result<AvailabilityWindow> {
        if self.fail_window_writes {
            return Err(BookingError::Store("schedule service unavailable".to_string()));
        }
        self.inner.update_window(id, payload)
    }

    fn delete_window(&self, id: &str) -> Result<()> {
        self.inner.delete_window(id)
    }
}

impl Directory for FlakyStore {
    fn doctor_name(&self, doctor_id: &str) -> Result<Option<String>> {
        self.inner.doctor_name(doctor_id)
    }

    fn register_patient(&self, patient: NewPatient) -> Result<String> {
        self.inner.register_patient(patient)
    }

    fn forget_patient(&self, patient_id: &str) -> Result<()> {
        self.inner.forget_patient(patient_id)
    }
}

/// Store with Dr. Amara Okafor (`d1`) and Dr. Lena Brandt (`d2`).
pub fn clinic() -> MemoryStore {
    let store = MemoryStore::default();
    store.add_doctor("d1", "Dr. Amara Okafor").unwrap();
    store.add_doctor("d2", "Dr. Lena Brandt").unwrap();
    store
}

pub fn services<'a>(store: &'a MemoryStore, notifier: &'a RecordingNotifier) -> Services<'a> {
    Services {
        appointments: store,
        schedules: store,
        directory: store,
        notifier,
    }
}

pub fn add_window(
    store: &dyn ScheduleStore,
    doctor: &str,
    day: &str,
    start: &str,
    end: &str,
    max: Option<u32>,
) -> AvailabilityWindow {
    let payload = WindowDraft::new(day, start, end, max)
        .into_payload(doctor)
        .unwrap();
    store.create_window(payload).unwrap()
}

/// Seed an active booking directly, bypassing the engine.
pub fn seed_booking(store: &MemoryStore, id: &str, doctor: &str, on: &str, at: &str) -> Booking {
    let booking = Booking {
        id: id.to_string(),
        doctor_id: doctor.to_string(),
        patient_id: format!("patient-of-{}", id),
        department_id: "cardiology".to_string(),
        date: date(on),
        time: at.parse().unwrap(),
        status: BookingStatus::Scheduled,
        reason: None,
    };
    store.insert_booking(booking.clone()).unwrap();
    booking
}

pub fn request(target: BookingTarget, patient: &str, on: &str, at: &str) -> BookingRequest {
    BookingRequest {
        target,
        patient: Some(PatientRef::Existing(patient.to_string())),
        doctor_id: Some("d1".to_string()),
        department_id: Some("cardiology".to_string()),
        date: Some(on.to_string()),
        time: Some(at.to_string()),
        reason: Some("follow-up".to_string()),
    }
}
