// libs/booking-cell/src/services/conflict.rs
use chrono::NaiveDate;
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use std::sync::Arc;

use shared_database::supabase::SupabaseClient;

use provider_cell::timeslot::{intervals_overlap, is_valid_range};

use crate::models::{Appointment, BookingError};

pub struct ConflictService {
    supabase: Arc<SupabaseClient>,
}

impl ConflictService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    /// Whether `[start, end)` is free for the provider on the given date.
    ///
    /// Only `upcoming` and `confirmed` appointments occupy slots; an
    /// appointment named by `exclude_id` is ignored (re-validation of an
    /// existing booking). An inverted or empty candidate interval is an
    /// error, not a result.
    pub async fn is_interval_available(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
        start_minutes: i32,
        end_minutes: i32,
        exclude_id: Option<Uuid>,
        auth_token: Option<&str>,
    ) -> Result<bool, BookingError> {
        if !is_valid_range(start_minutes, end_minutes) {
            return Err(BookingError::InvalidRange);
        }

        debug!(
            "Checking availability for provider {} on {} [{}..{})",
            provider_id, date, start_minutes, end_minutes
        );

        let appointments = self
            .blocking_appointments(provider_id, date, exclude_id, auth_token)
            .await?;

        let conflict = appointments.iter().any(|appointment| {
            let (booked_start, booked_end) = appointment.interval();
            intervals_overlap(start_minutes, end_minutes, booked_start, booked_end)
        });

        if conflict {
            warn!(
                "Conflict detected for provider {} on {} [{}..{})",
                provider_id, date, start_minutes, end_minutes
            );
        }

        Ok(!conflict)
    }

    /// The booked intervals occupying a provider's day, for slot
    /// enumeration. Returns minute pairs sorted by start.
    pub async fn booked_intervals(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
        auth_token: Option<&str>,
    ) -> Result<Vec<(i32, i32)>, BookingError> {
        let appointments = self
            .blocking_appointments(provider_id, date, None, auth_token)
            .await?;

        let mut intervals: Vec<(i32, i32)> = appointments
            .iter()
            .map(Appointment::interval)
            .collect();
        intervals.sort_unstable();

        Ok(intervals)
    }

    async fn blocking_appointments(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
        exclude_id: Option<Uuid>,
        auth_token: Option<&str>,
    ) -> Result<Vec<Appointment>, BookingError> {
        let mut query_parts = vec![
            format!("provider_id=eq.{}", provider_id),
            format!("date=eq.{}", date),
            "status=in.(upcoming,confirmed)".to_string(),
        ];

        if let Some(exclude_id) = exclude_id {
            query_parts.push(format!("id=neq.{}", exclude_id));
        }

        let path = format!(
            "/rest/v1/appointments?{}&order=start_time.asc",
            query_parts.join("&")
        );

        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            auth_token,
            None,
        ).await.map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        let appointments: Vec<Appointment> = result.into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<Appointment>, _>>()
            .map_err(|e| BookingError::DatabaseError(format!("Failed to parse appointments: {}", e)))?;

        Ok(appointments)
    }
}
