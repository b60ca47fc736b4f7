//! Incident tracker HTTP server.
//!
//! Exposes the incident lifecycle over JSON endpoints. Persistence, the
//! notification transport, and the authentication mode are picked from
//! configuration at startup.

pub mod api;
pub mod config;
pub mod error;
pub mod middleware;
pub mod state;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use auth::{JwtConfig, JwtManager};
use axum::Router;
use entities::{Role, User};
use incident_store::Store;
use lifecycle::IncidentController;
use notifier::{LogNotifier, NotificationDispatcher, Notifier, NotifyResult, WebhookNotifier};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::Config;
use crate::error::{ServerError, ServerResult};
use crate::state::{AppState, SharedState};

/// Creates the application router with all routes configured.
pub fn create_app<S: Store + 'static>(state: SharedState<S>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    api::create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Picks the notification transport from configuration.
pub fn create_notifier(config: &Config) -> NotifyResult<Arc<dyn Notifier>> {
    match &config.webhook_url {
        Some(url) => {
            tracing::info!(url = %url, "Delivering notifications by webhook");
            Ok(Arc::new(WebhookNotifier::new(url.clone())?))
        }
        None => {
            tracing::info!("No webhook configured, logging notifications");
            Ok(Arc::new(LogNotifier::new()))
        }
    }
}

/// Creates the application state with the given configuration, store and
/// notifier.
pub fn create_state<S: Store>(
    config: Config,
    store: S,
    notifier: Arc<dyn Notifier>,
) -> ServerResult<SharedState<S>> {
    let jwt_manager = if config.jwt_enabled() {
        let secret = config.jwt_secret.clone().ok_or_else(|| {
            ServerError::Internal("JWT auth mode requires a secret".to_string())
        })?;
        let jwt_config = JwtConfig::new(secret)
            .with_issuer(config.jwt_issuer.clone())
            .with_expiration_hours(config.jwt_expiration_hours);
        Some(JwtManager::new(jwt_config)?)
    } else {
        None
    };

    let controller =
        IncidentController::new(store, NotificationDispatcher::from_arc(notifier));

    Ok(Arc::new(AppState::new(config, controller, jwt_manager)))
}

/// Ensures the configured bootstrap admin exists. Returns the admin, or
/// `None` when no bootstrap email is configured.
pub async fn bootstrap_admin<S: Store>(state: &AppState<S>) -> ServerResult<Option<User>> {
    let Some(email) = state.config.bootstrap_admin_email.as_deref() else {
        return Ok(None);
    };
    let email = email.trim().to_lowercase();

    let admin = match state.store().get_user_by_email(&email).await? {
        Some(existing) => {
            if existing.role != Role::Admin {
                tracing::warn!(
                    user_id = %existing.id,
                    role = %existing.role,
                    "Bootstrap admin email belongs to a non-admin user"
                );
            }
            existing
        }
        None => {
            let admin = state
                .store()
                .create_user(User::new(email, Role::Admin).with_name("Administrator"))
                .await?;
            tracing::info!(user_id = %admin.id, email = %admin.email, "Created bootstrap admin");
            admin
        }
    };

    if state.config.jwt_enabled() {
        tracing::info!(user_id = %admin.id, "Bootstrap admin ready");
    } else {
        tracing::info!(user_id = %admin.id, "Bootstrap admin ready, send its id as X-User-Id");
    }

    Ok(Some(admin))
}

/// Initializes tracing with the given log level.
pub fn init_tracing(log_level: &str, json: bool) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}
