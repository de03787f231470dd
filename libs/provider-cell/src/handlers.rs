// libs/provider-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    CreateServiceRequest, ProviderError, UpdateAvailabilityRequest, UpdateServiceRequest,
};
use crate::services::catalog::CatalogService;
use crate::services::provider::ProviderService;

fn map_provider_error(e: ProviderError) -> AppError {
    match e {
        ProviderError::NotFound => AppError::NotFound("Provider not found".to_string()),
        ProviderError::ServiceNotFound => AppError::NotFound("Service not found".to_string()),
        ProviderError::InvalidTemplate(msg) => AppError::BadRequest(msg),
        ProviderError::InvalidService(msg) => AppError::BadRequest(msg),
        ProviderError::DatabaseError(msg) => AppError::Internal(msg),
    }
}

/// Resolve the calling provider's id, rejecting other roles.
fn require_provider(user: &User) -> Result<Uuid, AppError> {
    if !user.is_provider() {
        return Err(AppError::Forbidden("Provider role required".to_string()));
    }
    Uuid::parse_str(&user.id)
        .map_err(|_| AppError::BadRequest("Invalid provider ID".to_string()))
}

// ==============================================================================
// PUBLIC HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_public_provider(
    State(state): State<Arc<AppConfig>>,
    Path(provider_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let provider_service = ProviderService::new(&state);

    let profile = provider_service.get_public_profile(provider_id).await
        .map_err(map_provider_error)?;

    Ok(Json(json!(profile)))
}

// ==============================================================================
// AVAILABILITY TEMPLATE HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_availability(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let provider_id = require_provider(&user)?;
    let provider_service = ProviderService::new(&state);

    let template = provider_service.get_weekly_template(provider_id, Some(auth.token())).await
        .map_err(map_provider_error)?;

    Ok(Json(json!({ "available": template })))
}

#[axum::debug_handler]
pub async fn update_availability(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateAvailabilityRequest>,
) -> Result<Json<Value>, AppError> {
    let provider_id = require_provider(&user)?;
    let provider_service = ProviderService::new(&state);

    let provider = provider_service
        .replace_weekly_template(provider_id, request.available, auth.token())
        .await
        .map_err(map_provider_error)?;

    Ok(Json(json!({
        "success": true,
        "available": provider.available,
        "message": "Availability updated successfully"
    })))
}

// ==============================================================================
// SERVICE CATALOG HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_services(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let provider_id = require_provider(&user)?;
    let catalog = CatalogService::new(&state);

    let services = catalog.list_services(provider_id, Some(auth.token())).await
        .map_err(map_provider_error)?;

    Ok(Json(json!({
        "services": services,
        "total": services.len()
    })))
}

#[axum::debug_handler]
pub async fn add_service(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateServiceRequest>,
) -> Result<Json<Value>, AppError> {
    let provider_id = require_provider(&user)?;
    let catalog = CatalogService::new(&state);

    let service = catalog.create_service(provider_id, request, auth.token()).await
        .map_err(map_provider_error)?;

    Ok(Json(json!({
        "success": true,
        "service": service,
        "message": "Service created successfully"
    })))
}

#[axum::debug_handler]
pub async fn update_service(
    State(state): State<Arc<AppConfig>>,
    Path(service_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateServiceRequest>,
) -> Result<Json<Value>, AppError> {
    let provider_id = require_provider(&user)?;
    let catalog = CatalogService::new(&state);

    let service = catalog.update_service(provider_id, service_id, request, auth.token()).await
        .map_err(map_provider_error)?;

    Ok(Json(json!({
        "success": true,
        "service": service,
        "message": "Service updated successfully"
    })))
}

#[axum::debug_handler]
pub async fn delete_service(
    State(state): State<Arc<AppConfig>>,
    Path(service_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let provider_id = require_provider(&user)?;
    let catalog = CatalogService::new(&state);

    catalog.delete_service(provider_id, service_id, auth.token()).await
        .map_err(map_provider_error)?;

    Ok(Json(json!({
        "success": true,
        "message": "Service deleted successfully"
    })))
}

// ==============================================================================
// DASHBOARD HANDLER
// ==============================================================================

#[axum::debug_handler]
pub async fn get_dashboard(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let provider_id = require_provider(&user)?;
    let provider_service = ProviderService::new(&state);

    let dashboard = provider_service.get_dashboard(provider_id, auth.token()).await
        .map_err(map_provider_error)?;

    Ok(Json(json!(dashboard)))
}
