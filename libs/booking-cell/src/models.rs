// libs/booking-cell/src/models.rs
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use provider_cell::timeslot::TimeOfDay;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

/// One booked `[start_time, end_time)` interval on a provider's day.
/// Dates are persisted at day granularity; times as `HH:MM` strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub provider_id: Uuid,
    pub service_id: Uuid,
    pub date: NaiveDate,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub status: AppointmentStatus,
    pub is_cancelled: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// The interval in minutes since midnight, for overlap arithmetic.
    pub fn interval(&self) -> (i32, i32) {
        (self.start_time.minutes(), self.end_time.minutes())
    }

    /// Whether this appointment still occupies its slot.
    pub fn blocks_slot(&self) -> bool {
        matches!(
            self.status,
            AppointmentStatus::Upcoming | AppointmentStatus::Confirmed
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Upcoming,
    Confirmed,
    Completed,
    Cancelled,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Upcoming => write!(f, "upcoming"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

/// Booking request. Fields are optional so the validation pipeline can
/// report which one is missing instead of failing at deserialization;
/// times stay raw strings until the pipeline parses them.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAppointmentRequest {
    pub provider_id: Option<Uuid>,
    pub service_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: AppointmentStatus,
}

#[derive(Debug, Clone, Default)]
pub struct AppointmentSearchQuery {
    pub user_id: Option<Uuid>,
    pub provider_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    pub date: Option<NaiveDate>,
}

/// Free-slot listing for one provider and date.
#[derive(Debug, Clone, Serialize)]
pub struct FreeSlotsResponse {
    pub provider_id: Uuid,
    pub date: NaiveDate,
    pub duration_minutes: i32,
    pub available_slots: Vec<String>,
}

// ==============================================================================
// BOOKING LOCK
// ==============================================================================

/// Reservation lock spanning the conflict check and the insert for one
/// (provider, date). Expired rows are reaped by contenders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingLock {
    pub lock_key: String,
    pub provider_id: Uuid,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub process_id: String,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum BookingError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid time format. Use 24-hour HH:MM")]
    InvalidTimeFormat,

    #[error("End time must be after start time")]
    InvalidRange,

    #[error("Service not found or does not belong to provider")]
    ServiceNotFound,

    #[error("This time slot is already booked")]
    SlotUnavailable,

    #[error("Provider not found")]
    ProviderNotFound,

    #[error("Appointment not found")]
    NotFound,

    #[error("Appointment cannot be modified in current status: {0}")]
    InvalidStatusTransition(AppointmentStatus),

    #[error("Not authorized to access this appointment")]
    Unauthorized,

    #[error("Database error: {0}")]
    DatabaseError(String),
}
