//! Authentication middleware.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use entities::{Actor, User};
use incident_store::Store;
use uuid::Uuid;

use crate::config::AuthMode;
use crate::error::ServerError;
use crate::state::SharedState;

/// Header carrying the caller's user id in header mode.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The user behind the current request, loaded from the store.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    /// Returns the actor identity for lifecycle calls.
    pub fn actor(&self) -> Actor {
        self.0.actor()
    }
}

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| ServerError::Unauthenticated("no authenticated user".to_string()))
    }
}

/// Extracts the JWT token from the Authorization header.
fn extract_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Resolves the caller's user id from the request headers.
fn caller_id<S: Store>(state: &SharedState<S>, headers: &HeaderMap) -> Result<Uuid, ServerError> {
    match state.config.auth_mode {
        AuthMode::Header => headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ServerError::Unauthenticated("missing X-User-Id header".to_string()))?
            .trim()
            .parse()
            .map_err(|_| ServerError::Unauthenticated("malformed X-User-Id header".to_string())),
        AuthMode::Jwt => {
            let jwt_manager = state.jwt_manager.as_ref().ok_or_else(|| {
                tracing::error!("JWT manager not configured but JWT auth is enabled");
                ServerError::Internal("authentication misconfigured".to_string())
            })?;
            let token = extract_token(headers).ok_or_else(|| {
                ServerError::Unauthenticated("missing authorization header".to_string())
            })?;
            Ok(jwt_manager.validate_token(token)?.user_id()?)
        }
    }
}

/// Authentication middleware.
///
/// Resolves the caller, loads the user record, and stores it in the request
/// extensions as a [`CurrentUser`]. The role always comes from the stored
/// record, never from the credential.
pub async fn auth_middleware<S: Store + 'static>(
    State(state): State<SharedState<S>>,
    mut request: Request,
    next: Next,
) -> Response {
    let user_id = match caller_id(&state, request.headers()) {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    let user = match state.store().get_user(user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            tracing::debug!(user_id = %user_id, "Unknown caller");
            return ServerError::Unauthenticated("unknown user".to_string()).into_response();
        }
        Err(e) => return ServerError::from(e).into_response(),
    };

    tracing::trace!(user_id = %user.id, role = %user.role, "Authenticated request");
    request.extensions_mut().insert(CurrentUser(user));

    next.run(request).await
}
