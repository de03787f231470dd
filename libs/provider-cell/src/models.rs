// libs/provider-cell/src/models.rs
use chrono::{DateTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::timeslot::TimeOfDay;

// ==============================================================================
// WEEKLY AVAILABILITY TEMPLATE
// ==============================================================================

/// One weekday entry of a provider's recurring schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayAvailability {
    pub start: Option<TimeOfDay>,
    pub end: Option<TimeOfDay>,
    #[serde(default = "default_is_available")]
    pub is_available: bool,
}

fn default_is_available() -> bool {
    true
}

impl Default for DayAvailability {
    fn default() -> Self {
        Self {
            start: None,
            end: None,
            is_available: true,
        }
    }
}

impl DayAvailability {
    /// Bookable window `(start, end)` in minutes since midnight, present
    /// only when the day is open and both bounds are configured with a
    /// non-empty range.
    pub fn window(&self) -> Option<(i32, i32)> {
        if !self.is_available {
            return None;
        }
        match (self.start, self.end) {
            (Some(start), Some(end)) if end.minutes() > start.minutes() => {
                Some((start.minutes(), end.minutes()))
            }
            _ => None,
        }
    }
}

/// Recurring weekly availability, owned by one provider and replaced
/// wholesale on update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeeklyTemplate {
    pub monday: DayAvailability,
    pub tuesday: DayAvailability,
    pub wednesday: DayAvailability,
    pub thursday: DayAvailability,
    pub friday: DayAvailability,
    pub saturday: DayAvailability,
    pub sunday: DayAvailability,
}

impl WeeklyTemplate {
    pub fn for_weekday(&self, weekday: Weekday) -> &DayAvailability {
        match weekday {
            Weekday::Mon => &self.monday,
            Weekday::Tue => &self.tuesday,
            Weekday::Wed => &self.wednesday,
            Weekday::Thu => &self.thursday,
            Weekday::Fri => &self.friday,
            Weekday::Sat => &self.saturday,
            Weekday::Sun => &self.sunday,
        }
    }

    /// Validate every configured day: both bounds present together, and
    /// end strictly after start.
    pub fn validate(&self) -> Result<(), String> {
        let days = [
            ("monday", &self.monday),
            ("tuesday", &self.tuesday),
            ("wednesday", &self.wednesday),
            ("thursday", &self.thursday),
            ("friday", &self.friday),
            ("saturday", &self.saturday),
            ("sunday", &self.sunday),
        ];

        for (name, day) in days {
            match (day.start, day.end) {
                (Some(start), Some(end)) => {
                    if end.minutes() <= start.minutes() {
                        return Err(format!("{}: end time must be after start time", name));
                    }
                }
                (None, None) => {}
                _ => {
                    return Err(format!("{}: start and end must be set together", name));
                }
            }
        }

        Ok(())
    }
}

// ==============================================================================
// PROVIDER AND SERVICE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provider {
    pub id: Uuid,
    pub name: String,
    pub bio: Option<String>,
    pub specialization: Option<String>,
    pub available: WeeklyTemplate,
    pub is_blocked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub title: String,
    pub category: String,
    pub description: Option<String>,
    pub price: f64,
    pub duration_minutes: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateAvailabilityRequest {
    pub available: WeeklyTemplate,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateServiceRequest {
    pub title: String,
    pub category: String,
    pub description: Option<String>,
    pub price: f64,
    pub duration_minutes: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateServiceRequest {
    pub title: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub duration_minutes: Option<i32>,
    pub is_active: Option<bool>,
}

/// Public-facing provider view: no moderation flags, services embedded.
#[derive(Debug, Clone, Serialize)]
pub struct PublicProviderProfile {
    pub id: Uuid,
    pub name: String,
    pub bio: Option<String>,
    pub specialization: Option<String>,
    pub available: WeeklyTemplate,
    pub services: Vec<Service>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderDashboard {
    pub total_services: u64,
    pub upcoming_appointments: u64,
    pub total_appointments: u64,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    #[error("Provider not found")]
    NotFound,

    #[error("Service not found")]
    ServiceNotFound,

    #[error("Invalid availability template: {0}")]
    InvalidTemplate(String),

    #[error("Invalid service definition: {0}")]
    InvalidService(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
