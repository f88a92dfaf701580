//! Booking engine -- validate and create one appointment.
//!
//! Checks run in a fixed order and stop at the first failure:
//!
//! 1. required fields present ([`BookingError::Validation`])
//! 2. time is `HH:MM` and date is `YYYY-MM-DD` ([`BookingError::Format`])
//! 3. against a window: the date falls on the window's weekday
//!    ([`BookingError::Validation`]) and the occurrence still has room
//!    ([`BookingError::CapacityExceeded`])
//! 4. no active booking holds the exact doctor/date/time
//!    ([`BookingError::SlotTaken`])
//! 5. persist, then tell the doctor (best-effort)
//!
//! Steps 3 and 4 read before the write. Two requests racing for the same
//! slot can both pass them; the store's unique constraint decides which one
//! lands. A patient registered for the losing request is removed again.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::access::Actor;
use crate::config::EngineConfig;
use crate::counter::count_active_in_window;
use crate::error::{BookingError, Result};
use crate::model::{
    AvailabilityWindow, Booking, BookingCriteria, BookingStatus, BookingUpdate, NewBooking,
    NewPatient,
};
use crate::projection::{format_date, parse_date, weekday_name};
use crate::store::Services;
use crate::time::{parse_time, ClockTime};

/// What a booking is made against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "windowId", rename_all = "lowercase")]
pub enum BookingTarget {
    /// A recurring window; capacity and range rules apply.
    Window(String),
    /// A free-form date and time entered by staff.
    Manual,
}

/// The patient a booking is for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PatientRef {
    Existing(String),
    New(NewPatient),
}

/// A booking form as submitted. Everything the form can leave blank is an
/// `Option`; blanks are treated the same as missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub target: BookingTarget,
    pub patient: Option<PatientRef>,
    pub doctor_id: Option<String>,
    pub department_id: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub reason: Option<String>,
}

/// Fields that survived step 1.
struct Filled {
    patient: PatientRef,
    doctor_id: String,
    department_id: String,
    date: String,
    time: String,
}

pub struct BookingEngine<'a> {
    services: Services<'a>,
    config: EngineConfig,
}

impl<'a> BookingEngine<'a> {
    pub fn new(services: Services<'a>, config: EngineConfig) -> Self {
        BookingEngine { services, config }
    }

    /// Validate `request` and create exactly one booking.
    ///
    /// Nothing is written when any check fails. A failed doctor notification
    /// is logged and does not fail the booking.
    pub fn book(&self, actor: &Actor, request: BookingRequest) -> Result<Booking> {
        let filled = required_fields(&request)?;
        let existing_patient = match &filled.patient {
            PatientRef::Existing(id) => Some(id.as_str()),
            PatientRef::New(_) => None,
        };
        actor.ensure_can_book_for(existing_patient)?;

        let time = parse_time(&filled.time)?;
        let date = parse_date(&filled.date)?;

        let doctor = self.services.doctor_label(&filled.doctor_id)?;
        let window = match &request.target {
            BookingTarget::Window(window_id) => {
                let window = self.services.schedules.find_window(window_id)?;
                self.check_window(&window, &filled.doctor_id, &doctor, date, time)?;
                Some(window)
            }
            BookingTarget::Manual => None,
        };

        self.check_slot_free(&filled.doctor_id, &doctor, date, time, window.as_ref())?;

        let (patient_id, registered) = match filled.patient {
            PatientRef::Existing(id) => (id, false),
            PatientRef::New(patient) => (self.services.directory.register_patient(patient)?, true),
        };
        let created = self.services.appointments.create_booking(NewBooking {
            doctor_id: filled.doctor_id,
            patient_id: patient_id.clone(),
            department_id: filled.department_id,
            date,
            time,
            reason: request.reason.filter(|r| !r.trim().is_empty()),
        });
        let booking = match created {
            Ok(booking) => booking,
            Err(err) => {
                if registered {
                    self.forget_registered(&patient_id);
                }
                return Err(err);
            }
        };
        info!(
            booking = %booking.id,
            doctor = %booking.doctor_id,
            patient = %booking.patient_id,
            "booked {} at {}",
            booking.date,
            booking.time
        );

        if self.config.notify_doctor_on_booking {
            if let Err(err) = self.services.notifier.notify_doctor(&booking) {
                warn!(booking = %booking.id, error = %err, "doctor notification failed");
            }
        }

        Ok(booking)
    }

    /// Mark a booking cancelled, releasing its place in the window.
    pub fn cancel(&self, actor: &Actor, booking_id: &str) -> Result<Booking> {
        let booking = self.services.appointments.find_booking(booking_id)?;
        match actor {
            Actor::Admin => {}
            Actor::Doctor(id) if *id == booking.doctor_id => {}
            Actor::Patient(id) if *id == booking.patient_id => {}
            other => {
                return Err(BookingError::Forbidden(format!(
                    "{} cannot cancel booking {}",
                    other, booking_id
                )))
            }
        }
        if booking.status == BookingStatus::Cancelled {
            return Ok(booking);
        }

        let cancelled = self.services.appointments.update_booking(
            booking_id,
            &BookingUpdate {
                status: Some(BookingStatus::Cancelled),
                ..Default::default()
            },
        )?;
        info!(booking = %booking_id, "cancelled booking");
        Ok(cancelled)
    }

    /// Undo a registration whose booking was refused by the store.
    fn forget_registered(&self, patient_id: &str) {
        if let Err(err) = self.services.directory.forget_patient(patient_id) {
            warn!(patient = %patient_id, error = %err, "could not remove orphaned patient record");
        }
    }

    fn check_window(
        &self,
        window: &AvailabilityWindow,
        doctor_id: &str,
        doctor: &str,
        date: NaiveDate,
        time: ClockTime,
    ) -> Result<()> {
        if window.doctor_id != doctor_id {
            return Err(BookingError::Validation(format!(
                "schedule window {} does not belong to {}",
                window.id, doctor
            )));
        }
        if date.weekday() != window.day_of_week {
            return Err(BookingError::Validation(format!(
                "{}'s {} slot only takes {} bookings; {} is a {}",
                doctor,
                window,
                weekday_name(window.day_of_week),
                format_date(date),
                weekday_name(date.weekday())
            )));
        }
        if self.config.require_time_in_window && !window.contains(time) {
            return Err(BookingError::Validation(format!(
                "{} is outside {}'s {} slot; choose a time between {} and {}",
                time, doctor, window, window.start_time, window.end_time
            )));
        }
        if let Some(max) = window.capacity() {
            let booked = count_active_in_window(self.services.appointments, window, date)?;
            if booked >= max as usize {
                return Err(BookingError::CapacityExceeded(format!(
                    "{}'s {} slot on {} is full ({} of {} places booked)",
                    doctor,
                    window,
                    format_date(date),
                    booked,
                    max
                )));
            }
        }
        Ok(())
    }

    fn check_slot_free(
        &self,
        doctor_id: &str,
        doctor: &str,
        date: NaiveDate,
        time: ClockTime,
        window: Option<&AvailabilityWindow>,
    ) -> Result<()> {
        let taken = self
            .services
            .appointments
            .find_bookings(&BookingCriteria::active(doctor_id, date))?
            .iter()
            .any(|b| b.time == time);
        if !taken {
            return Ok(());
        }

        let mut message = format!(
            "{} already has an appointment on {} at {}",
            doctor,
            format_date(date),
            time
        );
        if let Some(window) = window {
            message.push_str(&format!(
                "; please choose another time between {} and {}",
                window.start_time, window.end_time
            ));
        }
        Err(BookingError::SlotTaken(message))
    }
}

fn present(field: &Option<String>) -> Option<String> {
    field
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn required_fields(request: &BookingRequest) -> Result<Filled> {
    let mut missing = Vec::new();

    let patient = match &request.patient {
        Some(PatientRef::Existing(id)) if !id.trim().is_empty() => {
            Some(PatientRef::Existing(id.trim().to_string()))
        }
        Some(PatientRef::New(p)) if !p.name.trim().is_empty() => Some(PatientRef::New(p.clone())),
        _ => None,
    };
    if patient.is_none() {
        missing.push("patient");
    }
    let doctor_id = present(&request.doctor_id);
    if doctor_id.is_none() {
        missing.push("doctor");
    }
    let department_id = present(&request.department_id);
    if department_id.is_none() {
        missing.push("department");
    }
    let date = present(&request.date);
    if date.is_none() {
        missing.push("date");
    }
    let time = present(&request.time);
    if time.is_none() {
        missing.push("time");
    }

    match (patient, doctor_id, department_id, date, time) {
        (Some(patient), Some(doctor_id), Some(department_id), Some(date), Some(time)) => {
            Ok(Filled {
                patient,
                doctor_id,
                department_id,
                date,
                time,
            })
        }
        _ => Err(BookingError::Validation(format!(
            "missing required fields: {}",
            missing.join(", ")
        ))),
    }
}
