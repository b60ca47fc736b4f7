//! Server error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use incident_store::StoreError;
use lifecycle::LifecycleError;
use rpc_protocol::{ApiError, ErrorBody, ErrorCode};

/// Server error type.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Invalid request parameters.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Missing or unusable credentials.
    #[error("Authentication required: {0}")]
    Unauthenticated(String),

    /// Permission denied.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Lifecycle rule violation.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// Store error outside the lifecycle controller.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Authentication error.
    #[error("Auth error: {0}")]
    Auth(#[from] auth::AuthError),

    /// Error already expressed in wire form.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Converts the error into its wire form.
    pub fn to_api_error(&self) -> ApiError {
        match self {
            ServerError::InvalidRequest(msg) => ApiError::invalid_request(msg.clone()),
            ServerError::Unauthenticated(msg) => ApiError::unauthenticated(msg.clone()),
            ServerError::PermissionDenied(msg) => ApiError::permission_denied(msg.clone()),
            ServerError::Lifecycle(e) => lifecycle_error(e),
            ServerError::Store(e) => store_error(e),
            ServerError::Auth(e) if e.is_expired() => ApiError::unauthenticated("Token expired"),
            ServerError::Auth(_) => ApiError::unauthenticated("Invalid token"),
            ServerError::Api(e) => e.clone(),
            ServerError::Internal(_) => internal(),
        }
    }
}

fn lifecycle_error(e: &LifecycleError) -> ApiError {
    let code = match e {
        LifecycleError::Validation(_) => ErrorCode::InvalidRequest,
        LifecycleError::Authorization(_) => ErrorCode::PermissionDenied,
        LifecycleError::State { .. } => ErrorCode::InvalidState,
        LifecycleError::NotFound { .. } => ErrorCode::NotFound,
        LifecycleError::RoleMismatch { .. } => ErrorCode::RoleMismatch,
        LifecycleError::Conflict { .. } => ErrorCode::Conflict,
        LifecycleError::Store(e) => return store_error(e),
    };
    ApiError::new(code, e.to_string())
}

fn store_error(e: &StoreError) -> ApiError {
    match e {
        StoreError::NotFound { .. } => ApiError::not_found(e.to_string()),
        StoreError::AlreadyExists { .. } => ApiError::new(ErrorCode::AlreadyExists, e.to_string()),
        StoreError::Conflict { .. } => ApiError::conflict(e.to_string()),
        _ => internal(),
    }
}

fn internal() -> ApiError {
    ApiError::internal("Internal server error")
}

/// HTTP status for an error code.
pub fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorCode::Unauthenticated => StatusCode::UNAUTHORIZED,
        ErrorCode::PermissionDenied => StatusCode::FORBIDDEN,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::InvalidState | ErrorCode::Conflict | ErrorCode::AlreadyExists => {
            StatusCode::CONFLICT
        }
        ErrorCode::RoleMismatch => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let error = self.to_api_error();
        let status = status_for(error.code);

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(code = %error.code, error = %self, "Request rejected");
        }

        (status, Json(ErrorBody::from(error))).into_response()
    }
}

/// Result type alias for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
