// libs/booking-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use chrono::NaiveDate;
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    Appointment, AppointmentSearchQuery, AppointmentStatus, BookingError,
    CreateAppointmentRequest, UpdateStatusRequest,
};
use crate::services::availability::AvailabilityService;
use crate::services::booking::BookingService;

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct AppointmentQueryParams {
    pub user_id: Option<Uuid>,
    pub provider_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct FreeSlotsQuery {
    pub date: Option<NaiveDate>,
    pub service_id: Option<Uuid>,
    pub duration_minutes: Option<i32>,
}

fn map_booking_error(e: BookingError) -> AppError {
    match e {
        BookingError::MissingField(_)
        | BookingError::InvalidTimeFormat
        | BookingError::InvalidRange
        | BookingError::ServiceNotFound
        | BookingError::SlotUnavailable => AppError::BadRequest(e.to_string()),
        BookingError::InvalidStatusTransition(_) => AppError::BadRequest(e.to_string()),
        BookingError::ProviderNotFound | BookingError::NotFound => AppError::NotFound(e.to_string()),
        BookingError::Unauthorized => AppError::Forbidden(e.to_string()),
        BookingError::DatabaseError(msg) => AppError::Internal(msg),
    }
}

/// Owner, the booked provider, or an admin.
fn authorize_appointment_access(user: &User, appointment: &Appointment) -> Result<(), AppError> {
    let is_owner = appointment.user_id.to_string() == user.id;
    let is_provider = appointment.provider_id.to_string() == user.id && user.is_provider();

    if !is_owner && !is_provider && !user.is_admin() {
        return Err(AppError::Forbidden(
            "Not authorized to access this appointment".to_string(),
        ));
    }

    Ok(())
}

// ==============================================================================
// PUBLIC HANDLERS
// ==============================================================================

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Free slots for a provider on a date. Public: users browse these
/// before authenticating.
#[axum::debug_handler]
pub async fn get_free_slots(
    State(state): State<Arc<AppConfig>>,
    Path(provider_id): Path<Uuid>,
    Query(params): Query<FreeSlotsQuery>,
) -> Result<Json<Value>, AppError> {
    let date = params.date
        .ok_or_else(|| AppError::BadRequest("Date is required".to_string()))?;

    let availability_service = AvailabilityService::new(&state);

    let response = availability_service
        .compute_free_slots(
            provider_id,
            date,
            params.duration_minutes,
            params.service_id,
            None,
        )
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!(response)))
}

// ==============================================================================
// BOOKING HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    if !user.is_user() {
        return Err(AppError::Forbidden("Only users can book appointments".to_string()));
    }

    let user_id = Uuid::parse_str(&user.id)
        .map_err(|_| AppError::BadRequest("Invalid user ID".to_string()))?;

    let booking_service = BookingService::new(&state);

    let appointment = booking_service
        .validate_and_book(user_id, request, auth.token())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment booked successfully"
    })))
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<AppConfig>>,
    Query(params): Query<AppointmentQueryParams>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let booking_service = BookingService::new(&state);

    let mut search_query = AppointmentSearchQuery {
        user_id: params.user_id,
        provider_id: params.provider_id,
        status: params.status,
        date: params.date,
    };

    // Non-admins only ever see their own appointments
    if !user.is_admin() {
        let caller_id = Uuid::parse_str(&user.id)
            .map_err(|_| AppError::BadRequest("Invalid caller ID".to_string()))?;
        if user.is_provider() {
            search_query.provider_id = Some(caller_id);
        } else {
            search_query.user_id = Some(caller_id);
        }
    }

    let appointments = booking_service
        .search_appointments(search_query, auth.token())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let booking_service = BookingService::new(&state);

    let appointment = booking_service
        .get_appointment(appointment_id, auth.token())
        .await
        .map_err(map_booking_error)?;

    authorize_appointment_access(&user, &appointment)?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn update_appointment_status(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let booking_service = BookingService::new(&state);

    let appointment = booking_service
        .get_appointment(appointment_id, auth.token())
        .await
        .map_err(map_booking_error)?;

    authorize_appointment_access(&user, &appointment)?;

    let updated = booking_service
        .update_status(appointment_id, request, auth.token())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": updated,
        "message": "Appointment updated successfully"
    })))
}

/// Provider-side shorthand for transitioning a booking to confirmed.
#[axum::debug_handler]
pub async fn confirm_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    if !user.is_provider() && !user.is_admin() {
        return Err(AppError::Forbidden("Provider role required".to_string()));
    }

    let booking_service = BookingService::new(&state);

    let appointment = booking_service
        .get_appointment(appointment_id, auth.token())
        .await
        .map_err(map_booking_error)?;

    authorize_appointment_access(&user, &appointment)?;

    let updated = booking_service
        .update_status(
            appointment_id,
            UpdateStatusRequest { status: AppointmentStatus::Confirmed },
            auth.token(),
        )
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": updated,
        "message": "Appointment confirmed"
    })))
}

/// Cancellation shorthand for either party.
#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let booking_service = BookingService::new(&state);

    let appointment = booking_service
        .get_appointment(appointment_id, auth.token())
        .await
        .map_err(map_booking_error)?;

    authorize_appointment_access(&user, &appointment)?;

    let updated = booking_service
        .update_status(
            appointment_id,
            UpdateStatusRequest { status: AppointmentStatus::Cancelled },
            auth.token(),
        )
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": updated,
        "message": "Appointment cancelled"
    })))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let booking_service = BookingService::new(&state);

    let appointment = booking_service
        .get_appointment(appointment_id, auth.token())
        .await
        .map_err(map_booking_error)?;

    authorize_appointment_access(&user, &appointment)?;

    booking_service
        .delete_appointment(appointment_id, auth.token())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment deleted successfully"
    })))
}
