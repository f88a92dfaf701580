//! Error types for slot-engine operations.

use thiserror::Error;

/// Errors raised by the booking core and its collaborators.
///
/// `Format`, `Validation`, `CapacityExceeded`, `SlotTaken`, `NotFound` and
/// `Forbidden` fail the triggering operation. `Notification` is only ever
/// captured into an outcome, never returned from a booking or reschedule.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookingError {
    /// Malformed time, date or weekday input.
    #[error("Invalid format: {0}")]
    Format(String),

    /// A required field is missing or a store-side constraint rejected a write.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The window occurrence already holds its maximum number of bookings.
    #[error("Capacity exceeded: {0}")]
    CapacityExceeded(String),

    /// Another active booking holds the exact same doctor, date and time.
    #[error("Slot taken: {0}")]
    SlotTaken(String),

    /// A window or booking id did not resolve.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Best-effort notification delivery failed.
    #[error("Notification failed: {0}")]
    Notification(String),

    /// The acting user may not perform this operation.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The backing store could not be reached or returned garbage.
    #[error("Store error: {0}")]
    Store(String),
}

impl From<serde_json::Error> for BookingError {
    fn from(err: serde_json::Error) -> Self {
        BookingError::Store(format!("state serialization: {}", err))
    }
}

/// Convenience alias used throughout slot-engine.
pub type Result<T> = std::result::Result<T, BookingError>;
