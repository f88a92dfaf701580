//! Engine settings.

use serde::{Deserialize, Serialize};

/// Switches for the optional parts of the booking flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Tell the doctor about each new booking (best-effort).
    pub notify_doctor_on_booking: bool,
    /// Reject window bookings whose time falls outside the window.
    pub require_time_in_window: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            notify_doctor_on_booking: true,
            require_time_in_window: true,
        }
    }
}
