// libs/booking-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn appointment_routes(state: Arc<AppConfig>) -> Router {
    // Public: liveness and slot discovery
    let public_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/providers/{provider_id}/free-slots", get(handlers::get_free_slots));

    // Everything touching bookings requires authentication
    let protected_routes = Router::new()
        .route("/", post(handlers::create_appointment))
        .route("/", get(handlers::list_appointments))
        .route("/{appointment_id}", get(handlers::get_appointment))
        .route("/{appointment_id}", delete(handlers::delete_appointment))
        .route("/{appointment_id}/status", put(handlers::update_appointment_status))
        .route("/{appointment_id}/confirm", put(handlers::confirm_appointment))
        .route("/{appointment_id}/cancel", put(handlers::cancel_appointment))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
