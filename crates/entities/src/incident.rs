//! Incident-related entity definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of an Incident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    /// Filed, waiting for a technician.
    Open,
    /// A technician is working on it.
    Assigned,
    /// Closed with resolution notes. Terminal.
    Resolved,
}

impl Default for IncidentStatus {
    fn default() -> Self {
        Self::Open
    }
}

impl IncidentStatus {
    /// Converts the status to a string for storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Assigned => "assigned",
            Self::Resolved => "resolved",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(Self::Open),
            "assigned" => Some(Self::Assigned),
            "resolved" => Some(Self::Resolved),
            _ => None,
        }
    }

    /// Returns true if no transition leaves this status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved)
    }
}

impl std::fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reported incident.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    /// Unique identifier.
    pub id: Uuid,
    /// Short summary.
    pub title: String,
    /// Free-text description.
    pub description: String,
    /// User who filed the incident. Never changes.
    pub reporter_id: Uuid,
    /// Assigned technician, unset while Open.
    pub technician_id: Option<Uuid>,
    /// Current status.
    pub status: IncidentStatus,
    /// Notes recorded by the technician.
    pub resolution_notes: Option<String>,
    /// Optimistic concurrency token. Zero until first saved.
    pub version: u64,
    /// When this record was created.
    pub created_at: DateTime<Utc>,
    /// When this record was last updated.
    pub updated_at: DateTime<Utc>,
    /// When the incident was resolved.
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Incident {
    /// Creates a new open incident filed by `reporter_id`.
    pub fn new(
        reporter_id: Uuid,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: description.into(),
            reporter_id,
            technician_id: None,
            status: IncidentStatus::Open,
            resolution_notes: None,
            version: 0,
            created_at: now,
            updated_at: now,
            resolved_at: None,
        }
    }

    /// Returns true if `user_id` is the assigned technician.
    pub fn is_assigned_to(&self, user_id: Uuid) -> bool {
        self.technician_id == Some(user_id)
    }

    /// Marks the record as modified now.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Checks the per-status invariants that can be verified from the record
    /// alone. The technician's role is checked by the controller at assignment
    /// time.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        match self.status {
            IncidentStatus::Open if self.technician_id.is_some() => {
                Err(InvariantViolation::OpenWithTechnician)
            }
            IncidentStatus::Assigned if self.technician_id.is_none() => {
                Err(InvariantViolation::AssignedWithoutTechnician)
            }
            IncidentStatus::Resolved
                if self
                    .resolution_notes
                    .as_deref()
                    .is_none_or(|notes| notes.trim().is_empty()) =>
            {
                Err(InvariantViolation::ResolvedWithoutNotes)
            }
            _ => Ok(()),
        }
    }
}

/// A per-status invariant that a record fails to satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvariantViolation {
    /// Open incidents must not have a technician.
    OpenWithTechnician,
    /// Assigned incidents must have a technician.
    AssignedWithoutTechnician,
    /// Resolved incidents must carry non-empty notes.
    ResolvedWithoutNotes,
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let message = match self {
            Self::OpenWithTechnician => "open incident has a technician",
            Self::AssignedWithoutTechnician => "assigned incident has no technician",
            Self::ResolvedWithoutNotes => "resolved incident has no resolution notes",
        };
        f.write_str(message)
    }
}

impl std::error::Error for InvariantViolation {}

/// Field changes applied by an update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentUpdate {
    /// New title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// New working notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution_notes: Option<String>,
}

impl IncidentUpdate {
    /// Sets the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the working notes.
    pub fn with_resolution_notes(mut self, notes: impl Into<String>) -> Self {
        self.resolution_notes = Some(notes.into());
        self
    }

    /// Returns true if no field would change.
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.resolution_notes.is_none()
    }

    /// Applies the changes to `incident`.
    pub fn apply_to(self, incident: &mut Incident) {
        if let Some(title) = self.title {
            incident.title = title;
        }
        if let Some(description) = self.description {
            incident.description = description;
        }
        if let Some(notes) = self.resolution_notes {
            incident.resolution_notes = Some(notes);
        }
    }
}
