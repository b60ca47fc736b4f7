//! Notifier that keeps delivered messages in memory.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use entities::Incident;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{NotificationKind, Notifier, NotifyError, NotifyResult};

/// A notification captured by [`RecordingNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentNotification {
    /// Recipient address.
    pub to: String,
    /// Lifecycle event.
    pub kind: NotificationKind,
    /// Incident the message was about.
    pub incident_id: Uuid,
}

/// In-memory notifier for testing purposes.
///
/// Can be switched into a failing mode to exercise delivery-error handling.
#[derive(Debug, Default, Clone)]
pub struct RecordingNotifier {
    sent: Arc<RwLock<Vec<SentNotification>>>,
    fail: Arc<AtomicBool>,
}

impl RecordingNotifier {
    /// Creates a new recording notifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a notifier whose every send fails.
    pub fn failing() -> Self {
        let notifier = Self::default();
        notifier.set_failing(true);
        notifier
    }

    /// Switches failing mode on or off.
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Returns every successfully delivered notification, in order.
    pub async fn sent(&self) -> Vec<SentNotification> {
        self.sent.read().await.clone()
    }

    /// Waits until at least `count` notifications have been delivered, or
    /// `timeout` elapses. Returns what was delivered either way.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> Vec<SentNotification> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let sent = self.sent().await;
            if sent.len() >= count || tokio::time::Instant::now() >= deadline {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(
        &self,
        to: &str,
        kind: NotificationKind,
        incident: &Incident,
    ) -> NotifyResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifyError::delivery(to, "recording notifier set to fail"));
        }

        self.sent.write().await.push(SentNotification {
            to: to.to_string(),
            kind,
            incident_id: incident.id,
        });
        Ok(())
    }
}
