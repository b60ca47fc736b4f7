//! User-related entity definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role held by a user. Each user has exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Files incidents.
    Reporter,
    /// Works on incidents assigned to them.
    Technician,
    /// Unrestricted transition authority.
    Admin,
}

impl Default for Role {
    fn default() -> Self {
        Self::Reporter
    }
}

impl Role {
    /// Converts the role to a string for storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reporter => "reporter",
            Self::Technician => "technician",
            Self::Admin => "admin",
        }
    }

    /// Parses a role from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "reporter" => Some(Self::Reporter),
            "technician" => Some(Self::Technician),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    /// Returns the capability set granted by this role.
    pub fn capabilities(&self) -> Capabilities {
        match self {
            Self::Reporter => Capabilities {
                can_report: true,
                ..Capabilities::NONE
            },
            Self::Technician => Capabilities {
                can_resolve: true,
                ..Capabilities::NONE
            },
            Self::Admin => Capabilities {
                can_assign: true,
                can_resolve: true,
                ..Capabilities::NONE
            },
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a caller is permitted to do, independent of how the permission was
/// granted.
///
/// `can_resolve` covers both updating and resolving. Holders that cannot
/// `assign` are further restricted to incidents assigned to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// May file new incidents.
    pub can_report: bool,
    /// May assign any incident to a technician.
    pub can_assign: bool,
    /// May update and resolve incidents.
    pub can_resolve: bool,
}

impl Capabilities {
    /// The empty capability set.
    pub const NONE: Self = Self {
        can_report: false,
        can_assign: false,
        can_resolve: false,
    };

    /// Returns true if this set grants authority over every incident rather
    /// than only the caller's own assignments.
    pub fn is_unrestricted(&self) -> bool {
        self.can_assign
    }
}

/// A user of the incident tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier.
    pub id: Uuid,
    /// Email address, used for notifications.
    pub email: String,
    /// Display name.
    pub name: Option<String>,
    /// Role held by the user.
    pub role: Role,
    /// When this record was created.
    pub created_at: DateTime<Utc>,
    /// When this record was last updated.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Creates a new user.
    pub fn new(email: impl Into<String>, role: Role) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            name: None,
            role,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Returns the actor identity for this user.
    pub fn actor(&self) -> Actor {
        Actor {
            id: self.id,
            role: self.role,
            email: self.email.clone(),
        }
    }
}

/// The authenticated caller of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// User ID.
    pub id: Uuid,
    /// Role the caller acts under.
    pub role: Role,
    /// Contact address.
    pub email: String,
}

impl Actor {
    /// Returns the capability set of this actor.
    pub fn capabilities(&self) -> Capabilities {
        self.role.capabilities()
    }
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        user.actor()
    }
}
