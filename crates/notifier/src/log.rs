//! Notifier that writes messages to the log.

use async_trait::async_trait;
use entities::Incident;

use crate::{NotificationKind, Notifier, NotifyResult, render_message};

/// Notifier that records each message as a tracing event. Used when no
/// transport is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl LogNotifier {
    /// Creates a new log notifier.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(
        &self,
        to: &str,
        kind: NotificationKind,
        incident: &Incident,
    ) -> NotifyResult<()> {
        let message = render_message(kind, incident);
        tracing::info!(
            to = %to,
            kind = %kind,
            incident_id = %incident.id,
            subject = %message.subject,
            "Notification"
        );
        Ok(())
    }
}
