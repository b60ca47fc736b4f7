//! API request types.

use entities::{IncidentStatus, Role};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ApiError;

/// Parses an id field, naming the field in the error.
pub fn parse_id(field: &str, value: &str) -> Result<Uuid, ApiError> {
    value
        .trim()
        .parse()
        .map_err(|_| ApiError::invalid_request(format!("Invalid {field}")))
}

// ============================================================================
// Incident Service Requests
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateIncidentRequest {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignIncidentRequest {
    pub incident_id: String,
    pub technician_id: String,
}

/// Only the fields present in the body are changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateIncidentRequest {
    pub incident_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution_notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveIncidentRequest {
    pub incident_id: String,
    pub resolution_notes: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetIncidentRequest {
    pub incident_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListIncidentsRequest {
    #[serde(default)]
    pub status: Option<IncidentStatus>,
    #[serde(default)]
    pub reporter_id: Option<String>,
    #[serde(default)]
    pub technician_id: Option<String>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
}

// ============================================================================
// User Service Requests
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetUserRequest {
    pub user_id: String,
}

/// Issues a bearer token. Without `user_id` the token is for the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssueTokenRequest {
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListUsersRequest {
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
}
