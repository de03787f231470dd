// libs/provider-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn provider_routes(state: Arc<AppConfig>) -> Router {
    // Public discovery routes
    let public_routes = Router::new()
        .route("/public/{provider_id}", get(handlers::get_public_provider));

    // Everything else requires a provider bearer token
    let protected_routes = Router::new()
        .route("/availability", get(handlers::get_availability))
        .route("/availability", put(handlers::update_availability))
        .route("/services", get(handlers::list_services))
        .route("/services", post(handlers::add_service))
        .route("/services/{service_id}", put(handlers::update_service))
        .route("/services/{service_id}", axum::routing::delete(handlers::delete_service))
        .route("/dashboard", get(handlers::get_dashboard))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
