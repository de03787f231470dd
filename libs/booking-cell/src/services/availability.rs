// libs/booking-cell/src/services/availability.rs
use chrono::{Datelike, NaiveDate};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use provider_cell::services::catalog::CatalogService;
use provider_cell::services::provider::ProviderService;
use provider_cell::timeslot::{format_minutes, intervals_overlap};
use provider_cell::ProviderError;

use crate::models::{BookingError, FreeSlotsResponse};
use crate::services::conflict::ConflictService;

/// Fallback slot length when neither an explicit duration nor a service
/// reference is supplied. The single place this policy lives.
pub const DEFAULT_SLOT_DURATION_MINUTES: i32 = 60;

pub fn resolve_slot_duration(service_duration: Option<i32>) -> i32 {
    match service_duration {
        Some(duration) if duration > 0 => duration,
        _ => DEFAULT_SLOT_DURATION_MINUTES,
    }
}

/// Candidate starts for slots of `duration` minutes inside
/// `[day_start, day_end)`, stepping by the duration (candidates never
/// overlap each other), keeping those free of booked intervals.
pub fn free_slot_starts(
    day_start: i32,
    day_end: i32,
    duration: i32,
    booked: &[(i32, i32)],
) -> Vec<i32> {
    let mut slots = Vec::new();

    if duration <= 0 || day_end - day_start < duration {
        return slots;
    }

    let mut candidate = day_start;
    while candidate + duration <= day_end {
        let conflicts = booked
            .iter()
            .any(|&(start, end)| intervals_overlap(candidate, candidate + duration, start, end));
        if !conflicts {
            slots.push(candidate);
        }
        candidate += duration;
    }

    slots
}

pub struct AvailabilityService {
    conflict_service: ConflictService,
    provider_service: ProviderService,
    catalog: CatalogService,
}

impl AvailabilityService {
    pub fn new(config: &AppConfig) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));
        Self {
            conflict_service: ConflictService::new(supabase),
            provider_service: ProviderService::new(config),
            catalog: CatalogService::new(config),
        }
    }

    /// Free slots for one provider and date: a point-in-time snapshot of
    /// the weekly template minus the day's booked intervals.
    pub async fn compute_free_slots(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
        duration_minutes: Option<i32>,
        service_id: Option<Uuid>,
        auth_token: Option<&str>,
    ) -> Result<FreeSlotsResponse, BookingError> {
        let duration = self
            .resolve_duration(provider_id, duration_minutes, service_id, auth_token)
            .await?;

        debug!(
            "Computing free slots for provider {} on {} with duration {}",
            provider_id, date, duration
        );

        let provider = self.provider_service.get_provider(provider_id, auth_token).await
            .map_err(|e| match e {
                ProviderError::NotFound => BookingError::ProviderNotFound,
                other => BookingError::DatabaseError(other.to_string()),
            })?;

        if provider.is_blocked {
            return Err(BookingError::ProviderNotFound);
        }

        let day = provider.available.for_weekday(date.weekday());
        let Some((day_start, day_end)) = day.window() else {
            return Ok(FreeSlotsResponse {
                provider_id,
                date,
                duration_minutes: duration,
                available_slots: Vec::new(),
            });
        };

        let booked = self
            .conflict_service
            .booked_intervals(provider_id, date, auth_token)
            .await?;

        let available_slots = free_slot_starts(day_start, day_end, duration, &booked)
            .into_iter()
            .map(format_minutes)
            .collect();

        Ok(FreeSlotsResponse {
            provider_id,
            date,
            duration_minutes: duration,
            available_slots,
        })
    }

    /// Duration resolution order: explicit request parameter, then the
    /// referenced service's configured duration, then the named fallback.
    async fn resolve_duration(
        &self,
        provider_id: Uuid,
        duration_minutes: Option<i32>,
        service_id: Option<Uuid>,
        auth_token: Option<&str>,
    ) -> Result<i32, BookingError> {
        if let Some(duration) = duration_minutes {
            if duration <= 0 {
                return Err(BookingError::InvalidRange);
            }
            return Ok(duration);
        }

        if let Some(service_id) = service_id {
            let service = self
                .catalog
                .find_provider_service(service_id, provider_id, auth_token)
                .await
                .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

            return Ok(resolve_slot_duration(
                service.map(|s| s.duration_minutes),
            ));
        }

        Ok(resolve_slot_duration(None))
    }
}
