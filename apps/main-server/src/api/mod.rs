//! API endpoints.

pub mod incident;
pub mod user;

use axum::{
    Json, Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use incident_store::Store;
use rpc_protocol::responses::HealthResponse;

use crate::middleware::auth_middleware;
use crate::state::SharedState;

/// Creates the API router with all endpoints. Everything except `/health`
/// requires an authenticated caller.
pub fn create_router<S: Store + 'static>(state: SharedState<S>) -> Router {
    let authenticated = Router::new()
        // Incident endpoints
        .route("/api/incident/create", post(incident::create_incident::<S>))
        .route("/api/incident/assign", post(incident::assign_incident::<S>))
        .route("/api/incident/update", post(incident::update_incident::<S>))
        .route("/api/incident/resolve", post(incident::resolve_incident::<S>))
        .route("/api/incident/get", post(incident::get_incident::<S>))
        .route("/api/incident/list", post(incident::list_incidents::<S>))
        // User endpoints
        .route("/api/user/create", post(user::create_user::<S>))
        .route("/api/user/get", post(user::get_user::<S>))
        .route("/api/user/list", post(user::list_users::<S>))
        .route("/api/user/token", post(user::issue_token::<S>))
        .route("/api/user/me", get(user::get_current_user))
        .route_layer(from_fn_with_state(state.clone(), auth_middleware::<S>));

    Router::new()
        .merge(authenticated)
        // Health check
        .route("/health", get(health_check))
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
