//! Store trait definitions.

use async_trait::async_trait;
use entities::{Incident, IncidentStatus, Role, User};
use uuid::Uuid;

use crate::StoreResult;

/// Filter options for listing incidents.
#[derive(Debug, Clone, Default)]
pub struct IncidentFilter {
    /// Filter by status.
    pub status: Option<IncidentStatus>,
    /// Filter by reporter.
    pub reporter_id: Option<Uuid>,
    /// Filter by assigned technician.
    pub technician_id: Option<Uuid>,
    /// Maximum number of results.
    pub limit: Option<u32>,
    /// Offset for pagination.
    pub offset: Option<u32>,
}

impl IncidentFilter {
    /// Returns true if `incident` passes every set criterion. Pagination is
    /// not considered.
    pub fn matches(&self, incident: &Incident) -> bool {
        self.status.is_none_or(|s| incident.status == s)
            && self.reporter_id.is_none_or(|id| incident.reporter_id == id)
            && self
                .technician_id
                .is_none_or(|id| incident.technician_id == Some(id))
    }
}

/// Filter options for listing users.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    /// Filter by role.
    pub role: Option<Role>,
    /// Maximum number of results.
    pub limit: Option<u32>,
    /// Offset for pagination.
    pub offset: Option<u32>,
}

/// Trait for incident storage operations.
///
/// Writes are guarded by the incident's `version`: a save names the version
/// the caller read, and the store refuses it if another writer got there
/// first.
#[async_trait]
pub trait IncidentStore: Send + Sync {
    /// Gets an incident by ID.
    async fn get_incident(&self, id: Uuid) -> StoreResult<Option<Incident>>;

    /// Saves an incident if its stored version still equals
    /// `expected_version`, and returns it with the version bumped.
    ///
    /// An `expected_version` of zero inserts a new record and fails with
    /// `Conflict` if the ID is taken.
    async fn save_incident(
        &self,
        incident: Incident,
        expected_version: u64,
    ) -> StoreResult<Incident>;

    /// Lists incidents matching the filter, newest first, with the total
    /// count before pagination.
    async fn list_incidents(&self, filter: IncidentFilter) -> StoreResult<(Vec<Incident>, u32)>;
}

/// Trait for user storage operations.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Creates a new user.
    async fn create_user(&self, user: User) -> StoreResult<User>;

    /// Gets a user by ID.
    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// Gets a user by email.
    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Lists users with optional filters.
    async fn list_users(&self, filter: UserFilter) -> StoreResult<(Vec<User>, u32)>;
}

/// A store holding both incidents and users.
pub trait Store: IncidentStore + UserStore {}

impl<T: IncidentStore + UserStore> Store for T {}
