//! # slot-engine
//!
//! Booking core for doctor schedules: recurring weekly availability windows,
//! capacity-checked appointment booking, and propagation of window edits to
//! patients who already hold a booking.
//!
//! The engine never reads a clock or a session. "Today" and the acting user
//! are passed in on every call, and all persistence goes through the
//! collaborator traits in [`store`].
//!
//! ## Modules
//!
//! - [`time`]: `HH:MM` parsing, range validation, clamping
//! - [`projection`]: recurring weekday to next concrete date
//! - [`model`]: windows, bookings and store payloads
//! - [`store`]: collaborator traits and the in-memory [`MemoryStore`]
//! - [`schedule`]: window create/edit/delete and the availability view
//! - [`counter`]: active bookings inside one window occurrence
//! - [`booking`]: validate and create a booking
//! - [`reschedule`]: move booked patients when a window changes
//! - [`access`]: role rules
//! - [`config`]: engine switches
//! - [`error`]: error types

pub mod access;
pub mod booking;
pub mod config;
pub mod counter;
pub mod error;
pub mod model;
pub mod projection;
pub mod reschedule;
pub mod schedule;
pub mod store;
pub mod time;

pub use access::Actor;
pub use booking::{BookingEngine, BookingRequest, BookingTarget, PatientRef};
pub use config::EngineConfig;
pub use counter::count_active_in_window;
pub use error::BookingError;
pub use model::{AvailabilityWindow, Booking, BookingStatus, NewPatient};
pub use projection::next_occurrence;
pub use reschedule::{RescheduleEngine, RescheduleOutcome};
pub use schedule::WindowDraft;
pub use store::{MemoryStore, Services};
pub use time::{parse_time, validate_range, ClockTime};
