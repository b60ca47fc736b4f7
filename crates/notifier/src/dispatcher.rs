//! Fire-and-forget notification dispatch.

use std::sync::Arc;

use entities::Incident;
use tokio::sync::Mutex;
use tokio_util::task::TaskTracker;

use crate::{NotificationKind, Notifier};

/// Delivers notifications in the background.
///
/// Each delivery runs on its own task, so a slow or failing transport never
/// delays or fails the lifecycle operation that triggered it. Failures are
/// logged and dropped.
#[derive(Clone)]
pub struct NotificationDispatcher {
    notifier: Arc<dyn Notifier>,
    tracker: TaskTracker,
    /// Serializes `flush` and `shutdown`; holds true once shut down.
    closing: Arc<Mutex<bool>>,
}

impl std::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("in_flight", &self.tracker.len())
            .finish_non_exhaustive()
    }
}

impl NotificationDispatcher {
    /// Creates a dispatcher delivering through `notifier`.
    pub fn new(notifier: impl Notifier + 'static) -> Self {
        Self::from_arc(Arc::new(notifier))
    }

    /// Creates a dispatcher from a shared notifier.
    pub fn from_arc(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            notifier,
            tracker: TaskTracker::new(),
            closing: Arc::new(Mutex::new(false)),
        }
    }

    /// Queues a `kind` notification about `incident` for `to`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn dispatch(&self, to: impl Into<String>, kind: NotificationKind, incident: &Incident) {
        let to = to.into();
        let incident = incident.clone();
        let notifier = Arc::clone(&self.notifier);

        self.tracker.spawn(async move {
            match notifier.send(&to, kind, &incident).await {
                Ok(()) => {
                    tracing::debug!(to = %to, kind = %kind, incident_id = %incident.id, "Notification delivered");
                }
                Err(e) => {
                    tracing::warn!(
                        to = %to,
                        kind = %kind,
                        incident_id = %incident.id,
                        error = %e,
                        "Notification delivery failed"
                    );
                }
            }
        });
    }

    /// Returns the number of deliveries still in flight.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Waits for every delivery queued so far to finish. Dispatch keeps
    /// working afterwards, unless the dispatcher has been shut down.
    pub async fn flush(&self) {
        let shut_down = self.closing.lock().await;
        if *shut_down {
            drop(shut_down);
            self.tracker.wait().await;
            return;
        }
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Waits for in-flight deliveries before shutdown. The tracker stays
    /// closed afterwards.
    pub async fn shutdown(&self) {
        {
            let mut shut_down = self.closing.lock().await;
            *shut_down = true;
            self.tracker.close();
        }

        let pending = self.tracker.len();
        if pending > 0 {
            tracing::info!(pending, "Waiting for notifications to drain");
        }
        self.tracker.wait().await;
    }
}
