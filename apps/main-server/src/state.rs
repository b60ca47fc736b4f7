//! Application state.

use std::sync::Arc;

use auth::JwtManager;
use incident_store::Store;
use lifecycle::IncidentController;

use crate::config::Config;

/// Shared application state.
#[derive(Debug)]
pub struct AppState<S: Store> {
    /// Server configuration.
    pub config: Config,
    /// Lifecycle controller, which also owns the store and dispatcher.
    pub controller: IncidentController<S>,
    /// JWT manager (only in JWT mode).
    pub jwt_manager: Option<JwtManager>,
}

impl<S: Store> AppState<S> {
    /// Creates new application state.
    pub fn new(
        config: Config,
        controller: IncidentController<S>,
        jwt_manager: Option<JwtManager>,
    ) -> Self {
        Self {
            config,
            controller,
            jwt_manager,
        }
    }

    /// Returns the store.
    pub fn store(&self) -> &S {
        self.controller.store()
    }
}

/// Type alias for shared state.
pub type SharedState<S> = Arc<AppState<S>>;
