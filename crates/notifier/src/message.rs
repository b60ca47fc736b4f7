//! Notification kinds and message rendering.

use entities::Incident;
use serde::{Deserialize, Serialize};

/// Lifecycle event that triggers a notification.
///
/// Updates are deliberately absent: only these three transitions notify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// An incident was filed.
    Created,
    /// An incident was given to a technician.
    Assigned,
    /// An incident was resolved.
    Resolved,
}

impl NotificationKind {
    /// Converts the kind to a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Assigned => "assigned",
            Self::Resolved => "resolved",
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rendered notification ready for a transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationMessage {
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    pub body: String,
}

/// Renders the subject and body for `kind` on `incident`.
pub fn render_message(kind: NotificationKind, incident: &Incident) -> NotificationMessage {
    let (subject, body) = match kind {
        NotificationKind::Created => (
            format!("Incident filed: {}", incident.title),
            format!(
                "Your incident '{}' has been filed and is waiting for a technician.\n\n{}",
                incident.title, incident.description
            ),
        ),
        NotificationKind::Assigned => (
            format!("Incident assigned: {}", incident.title),
            format!(
                "Incident '{}' has been assigned to a technician.\n\n{}",
                incident.title, incident.description
            ),
        ),
        NotificationKind::Resolved => (
            format!("Incident resolved: {}", incident.title),
            format!(
                "Incident '{}' has been resolved.\n\nResolution notes:\n{}",
                incident.title,
                incident.resolution_notes.as_deref().unwrap_or_default()
            ),
        ),
    };

    NotificationMessage { subject, body }
}
