//! API response types.

use entities::{Incident, User};
use serde::{Deserialize, Serialize};

// ============================================================================
// Incident Service Responses
// ============================================================================

/// Returned by every endpoint that yields a single incident.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncidentResponse {
    pub incident: Incident,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListIncidentsResponse {
    pub incidents: Vec<Incident>,
    pub total_count: u32,
}

// ============================================================================
// User Service Responses
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub user: User,
}

/// In JWT mode the new user's access token is included so the admin can hand
/// it over.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserResponse {
    pub user: User,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListUsersResponse {
    pub users: Vec<User>,
    pub total_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub user_id: String,
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

// ============================================================================
// Health
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
