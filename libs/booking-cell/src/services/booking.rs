// libs/booking-cell/src/services/booking.rs
use chrono::{Duration, NaiveDate, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use provider_cell::services::catalog::CatalogService;
use provider_cell::timeslot::{format_minutes, is_valid_range, parse_time_of_day};

use crate::models::{
    Appointment, AppointmentSearchQuery, AppointmentStatus, BookingError,
    CreateAppointmentRequest, UpdateStatusRequest,
};
use crate::services::conflict::ConflictService;
use crate::services::lifecycle::AppointmentLifecycleService;

pub struct BookingService {
    supabase: Arc<SupabaseClient>,
    conflict_service: ConflictService,
    lifecycle_service: AppointmentLifecycleService,
    catalog: CatalogService,
    lock_timeout_seconds: i64,
    max_retry_attempts: u32,
}

impl BookingService {
    pub fn new(config: &AppConfig) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));

        Self {
            conflict_service: ConflictService::new(Arc::clone(&supabase)),
            lifecycle_service: AppointmentLifecycleService::new(),
            catalog: CatalogService::new(config),
            supabase,
            lock_timeout_seconds: 30,
            max_retry_attempts: 3,
        }
    }

    /// Validate and create a booking, fail-fast in pipeline order:
    /// required fields, time format, time range, service/provider pairing,
    /// then slot availability checked and reserved under the booking lock.
    pub async fn validate_and_book(
        &self,
        user_id: Uuid,
        request: CreateAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, BookingError> {
        // Step 1: required fields
        let provider_id = request.provider_id.ok_or(BookingError::MissingField("provider_id"))?;
        let service_id = request.service_id.ok_or(BookingError::MissingField("service_id"))?;
        let date = request.date.ok_or(BookingError::MissingField("date"))?;
        let start_raw = request.start_time.ok_or(BookingError::MissingField("start_time"))?;
        let end_raw = request.end_time.ok_or(BookingError::MissingField("end_time"))?;

        info!(
            "Booking request from user {} for provider {} on {}",
            user_id, provider_id, date
        );

        // Step 2: strict time parsing - malformed input is an error here,
        // never a midnight fallback
        let start_minutes = parse_time_of_day(&start_raw)
            .map_err(|_| BookingError::InvalidTimeFormat)?;
        let end_minutes = parse_time_of_day(&end_raw)
            .map_err(|_| BookingError::InvalidTimeFormat)?;

        // Step 3: interval must be non-empty
        if !is_valid_range(start_minutes, end_minutes) {
            return Err(BookingError::InvalidRange);
        }

        // Step 4: service must exist, belong to the provider, and be bookable
        let service = self
            .catalog
            .find_provider_service(service_id, provider_id, Some(auth_token))
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?
            .ok_or(BookingError::ServiceNotFound)?;

        if !service.is_active {
            return Err(BookingError::ServiceNotFound);
        }

        // Step 5: availability check and insert, atomic under the
        // (provider, date) booking lock
        self.reserve_and_create(
            user_id,
            provider_id,
            service_id,
            date,
            start_minutes,
            end_minutes,
            request.notes,
            auth_token,
        )
        .await
    }

    /// Check-and-reserve critical section. Two concurrent requests for
    /// the same provider and date serialize on the lock row, so at most
    /// one of two overlapping bookings can commit.
    #[allow(clippy::too_many_arguments)]
    async fn reserve_and_create(
        &self,
        user_id: Uuid,
        provider_id: Uuid,
        service_id: Uuid,
        date: NaiveDate,
        start_minutes: i32,
        end_minutes: i32,
        notes: Option<String>,
        auth_token: &str,
    ) -> Result<Appointment, BookingError> {
        let lock_key = self.booking_lock_key(provider_id, date);

        for attempt in 1..=self.max_retry_attempts {
            debug!("Booking attempt {} for lock {}", attempt, lock_key);

            if !self.acquire_booking_lock(&lock_key, provider_id).await? {
                if attempt < self.max_retry_attempts {
                    tokio::time::sleep(std::time::Duration::from_millis(100 * attempt as u64)).await;
                    continue;
                }
                warn!("Could not acquire booking lock {} after {} attempts", lock_key, attempt);
                return Err(BookingError::SlotUnavailable);
            }

            // Final conflict check under the lock
            let available = match self.conflict_service.is_interval_available(
                provider_id,
                date,
                start_minutes,
                end_minutes,
                None,
                Some(auth_token),
            ).await {
                Ok(available) => available,
                Err(e) => {
                    self.release_booking_lock(&lock_key).await?;
                    return Err(e);
                }
            };

            if !available {
                self.release_booking_lock(&lock_key).await?;
                return Err(BookingError::SlotUnavailable);
            }

            let created = self.create_appointment_record(
                user_id,
                provider_id,
                service_id,
                date,
                start_minutes,
                end_minutes,
                notes.clone(),
                auth_token,
            ).await;

            self.release_booking_lock(&lock_key).await?;

            return match created {
                Ok(appointment) => {
                    info!(
                        "Appointment {} booked for provider {} on {} [{} - {})",
                        appointment.id,
                        provider_id,
                        date,
                        format_minutes(start_minutes),
                        format_minutes(end_minutes)
                    );
                    Ok(appointment)
                }
                Err(e) => Err(e),
            };
        }

        Err(BookingError::SlotUnavailable)
    }

    #[allow(clippy::too_many_arguments)]
    async fn create_appointment_record(
        &self,
        user_id: Uuid,
        provider_id: Uuid,
        service_id: Uuid,
        date: NaiveDate,
        start_minutes: i32,
        end_minutes: i32,
        notes: Option<String>,
        auth_token: &str,
    ) -> Result<Appointment, BookingError> {
        let appointment_data = json!({
            "id": Uuid::new_v4(),
            "user_id": user_id,
            "provider_id": provider_id,
            "service_id": service_id,
            "date": date,
            "start_time": format_minutes(start_minutes),
            "end_time": format_minutes(end_minutes),
            "status": AppointmentStatus::Upcoming,
            "is_cancelled": false,
            "notes": notes,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339(),
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/appointments",
            Some(auth_token),
            Some(appointment_data),
            Some(headers),
        ).await.map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(BookingError::DatabaseError("Failed to create appointment".to_string()));
        }

        let appointment: Appointment = serde_json::from_value(result[0].clone())
            .map_err(|e| BookingError::DatabaseError(format!("Failed to parse appointment: {}", e)))?;

        Ok(appointment)
    }

    /// Fetch an appointment by id.
    pub async fn get_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, BookingError> {
        debug!("Fetching appointment: {}", appointment_id);

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(BookingError::NotFound);
        }

        let appointment: Appointment = serde_json::from_value(result[0].clone())
            .map_err(|e| BookingError::DatabaseError(format!("Failed to parse appointment: {}", e)))?;

        Ok(appointment)
    }

    /// List appointments matching the given filters, ordered by date and
    /// start time.
    pub async fn search_appointments(
        &self,
        query: AppointmentSearchQuery,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, BookingError> {
        debug!("Searching appointments with filters: {:?}", query);

        let mut query_parts = Vec::new();

        if let Some(user_id) = query.user_id {
            query_parts.push(format!("user_id=eq.{}", user_id));
        }
        if let Some(provider_id) = query.provider_id {
            query_parts.push(format!("provider_id=eq.{}", provider_id));
        }
        if let Some(status) = query.status {
            query_parts.push(format!("status=eq.{}", status));
        }
        if let Some(date) = query.date {
            query_parts.push(format!("date=eq.{}", urlencoding::encode(&date.to_string())));
        }

        query_parts.push("order=date.asc,start_time.asc".to_string());

        let path = format!("/rest/v1/appointments?{}", query_parts.join("&"));

        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        let appointments: Vec<Appointment> = result.into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<Appointment>, _>>()
            .map_err(|e| BookingError::DatabaseError(format!("Failed to parse appointments: {}", e)))?;

        Ok(appointments)
    }

    /// Apply a lifecycle transition. Cancelling also raises the
    /// cancellation flag; terminal states reject further updates.
    pub async fn update_status(
        &self,
        appointment_id: Uuid,
        request: UpdateStatusRequest,
        auth_token: &str,
    ) -> Result<Appointment, BookingError> {
        let current = self.get_appointment(appointment_id, auth_token).await?;

        self.lifecycle_service
            .validate_status_transition(&current.status, &request.status)?;

        let mut update_data = serde_json::Map::new();
        update_data.insert("status".to_string(), json!(request.status));
        if request.status == AppointmentStatus::Cancelled {
            update_data.insert("is_cancelled".to_string(), json!(true));
        }
        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(Value::Object(update_data)),
            Some(headers),
        ).await.map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(BookingError::NotFound);
        }

        let appointment: Appointment = serde_json::from_value(result[0].clone())
            .map_err(|e| BookingError::DatabaseError(format!("Failed to parse appointment: {}", e)))?;

        info!("Appointment {} transitioned to {}", appointment_id, appointment.status);
        Ok(appointment)
    }

    /// Hard delete.
    pub async fn delete_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<(), BookingError> {
        debug!("Deleting appointment: {}", appointment_id);

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::DELETE,
            &path,
            Some(auth_token),
            None,
            Some(headers),
        ).await.map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(BookingError::NotFound);
        }

        Ok(())
    }

    // ==============================================================================
    // BOOKING LOCK HELPERS
    // ==============================================================================

    fn booking_lock_key(&self, provider_id: Uuid, date: NaiveDate) -> String {
        format!("booking_{}_{}", provider_id, date)
    }

    /// Conditional insert into booking_locks; the unique lock_key makes
    /// the insert the mutual-exclusion point. A held-but-expired lock is
    /// reaped before retrying once.
    async fn acquire_booking_lock(
        &self,
        lock_key: &str,
        provider_id: Uuid,
    ) -> Result<bool, BookingError> {
        match self.try_insert_lock(lock_key, provider_id).await {
            Ok(()) => {
                debug!("Booking lock acquired: {}", lock_key);
                Ok(true)
            }
            Err(_) => {
                if self.check_and_cleanup_expired_lock(lock_key).await? {
                    match self.try_insert_lock(lock_key, provider_id).await {
                        Ok(()) => {
                            debug!("Booking lock acquired after cleanup: {}", lock_key);
                            Ok(true)
                        }
                        Err(_) => Ok(false),
                    }
                } else {
                    Ok(false)
                }
            }
        }
    }

    async fn try_insert_lock(&self, lock_key: &str, provider_id: Uuid) -> Result<(), BookingError> {
        let lock_data = json!({
            "lock_key": lock_key,
            "provider_id": provider_id,
            "acquired_at": Utc::now().to_rfc3339(),
            "expires_at": (Utc::now() + Duration::seconds(self.lock_timeout_seconds)).to_rfc3339(),
            "process_id": format!("booking_{}", Uuid::new_v4()),
        });

        let _: Value = self.supabase.request(
            Method::POST,
            "/rest/v1/booking_locks",
            None,
            Some(lock_data),
        ).await.map_err(|e| BookingError::DatabaseError(format!("Lock insert failed: {}", e)))?;

        Ok(())
    }

    async fn release_booking_lock(&self, lock_key: &str) -> Result<(), BookingError> {
        let _: Value = self.supabase.request(
            Method::DELETE,
            &format!("/rest/v1/booking_locks?lock_key=eq.{}", lock_key),
            None,
            None,
        ).await.map_err(|e| BookingError::DatabaseError(format!("Lock release failed: {}", e)))?;

        debug!("Booking lock released: {}", lock_key);
        Ok(())
    }

    /// Returns true when an expired lock row was removed and acquisition
    /// can be retried.
    async fn check_and_cleanup_expired_lock(&self, lock_key: &str) -> Result<bool, BookingError> {
        let response: Value = self.supabase.request(
            Method::GET,
            &format!("/rest/v1/booking_locks?lock_key=eq.{}&select=*", lock_key),
            None,
            None,
        ).await.map_err(|e| BookingError::DatabaseError(format!("Lock check failed: {}", e)))?;

        if let Some(locks) = response.as_array() {
            if let Some(lock) = locks.first() {
                if let Some(expires_at_str) = lock.get("expires_at").and_then(|v| v.as_str()) {
                    if let Ok(expires_at) = chrono::DateTime::parse_from_rfc3339(expires_at_str) {
                        if expires_at.with_timezone(&Utc) < Utc::now() {
                            self.release_booking_lock(lock_key).await?;
                            return Ok(true);
                        }
                    }
                }
            }
        }

        Ok(false)
    }
}
