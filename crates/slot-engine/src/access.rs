//! Role rules the booking core enforces before touching a store.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{BookingError, Result};

/// Who is acting. Sessions are resolved by the caller; the core only ever
/// sees the role and id passed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", content = "id", rename_all = "lowercase")]
pub enum Actor {
    Admin,
    Doctor(String),
    Patient(String),
}

impl Actor {
    /// Admins manage every window, doctors only their own.
    pub fn ensure_can_manage_windows(&self, doctor_id: &str) -> Result<()> {
        match self {
            Actor::Admin => Ok(()),
            Actor::Doctor(id) if id == doctor_id => Ok(()),
            Actor::Doctor(id) => Err(BookingError::Forbidden(format!(
                "doctor {} cannot manage the schedule of doctor {}",
                id, doctor_id
            ))),
            Actor::Patient(_) => Err(BookingError::Forbidden(
                "patients cannot manage doctor schedules".to_string(),
            )),
        }
    }

    /// Patients book only for themselves and cannot register someone new.
    /// `patient_id` is `None` for a new-patient payload.
    pub fn ensure_can_book_for(&self, patient_id: Option<&str>) -> Result<()> {
        match (self, patient_id) {
            (Actor::Patient(own), Some(target)) if own != target => Err(BookingError::Forbidden(
                format!("patient {} cannot book on behalf of patient {}", own, target),
            )),
            (Actor::Patient(_), None) => Err(BookingError::Forbidden(
                "patients cannot register new patients".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Actor::Admin => f.write_str("admin"),
            Actor::Doctor(id) => write!(f, "doctor:{}", id),
            Actor::Patient(id) => write!(f, "patient:{}", id),
        }
    }
}

impl FromStr for Actor {
    type Err = BookingError;

    /// Parses `admin`, `doctor:<id>` or `patient:<id>`.
    fn from_str(s: &str) -> Result<Self> {
        match s.split_once(':') {
            None if s == "admin" => Ok(Actor::Admin),
            Some(("doctor", id)) if !id.is_empty() => Ok(Actor::Doctor(id.to_string())),
            Some(("patient", id)) if !id.is_empty() => Ok(Actor::Patient(id.to_string())),
            _ => Err(BookingError::Format(format!(
                "'{}' is not an actor; expected admin, doctor:<id> or patient:<id>",
                s
            ))),
        }
    }
}
