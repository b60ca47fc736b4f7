//! Lifecycle error types.

use entities::{IncidentStatus, Role};
use incident_store::StoreError;
use thiserror::Error;

/// Errors returned by lifecycle operations. Every variant is reported to the
/// caller; none is swallowed.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Bad input shape.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The actor's role or assignment does not permit the operation.
    #[error("Not authorized: {0}")]
    Authorization(String),

    /// The operation is not a legal transition from the current status.
    #[error("Cannot {operation} an incident that is {status}")]
    State {
        operation: &'static str,
        status: IncidentStatus,
    },

    /// A referenced record does not exist.
    #[error("{entity_type} not found: {id}")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// A referenced user holds the wrong role.
    #[error("User {user_id} has role {actual}, expected {expected}")]
    RoleMismatch {
        user_id: String,
        expected: Role,
        actual: Role,
    },

    /// Another writer changed the incident first. Retry against a fresh read.
    #[error("Incident {id} was modified concurrently")]
    Conflict { id: String },

    /// Infrastructure failure in the store.
    #[error("Store error: {0}")]
    Store(StoreError),
}

impl LifecycleError {
    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates an authorization error.
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::Authorization(message.into())
    }

    /// Creates a not found error.
    pub fn not_found(entity_type: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity_type,
            id: id.to_string(),
        }
    }

    /// Returns true if the caller may retry the operation with fresh data.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

impl From<StoreError> for LifecycleError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { id, .. } => Self::Conflict { id },
            StoreError::NotFound { entity_type, id } => Self::NotFound { entity_type, id },
            other => Self::Store(other),
        }
    }
}

/// Result type for lifecycle operations.
pub type LifecycleResult<T> = Result<T, LifecycleError>;
