//! Notifier trait definition.

use std::sync::Arc;

use async_trait::async_trait;
use entities::Incident;

use crate::{NotificationKind, NotifyResult};

/// A message-sending capability (email, chat, webhook).
///
/// Implementations report failures through the returned error; callers on the
/// lifecycle path never see them.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends a `kind` notification about `incident` to `to`.
    async fn send(&self, to: &str, kind: NotificationKind, incident: &Incident)
        -> NotifyResult<()>;
}

#[async_trait]
impl<N: Notifier + ?Sized> Notifier for Arc<N> {
    async fn send(
        &self,
        to: &str,
        kind: NotificationKind,
        incident: &Incident,
    ) -> NotifyResult<()> {
        (**self).send(to, kind, incident).await
    }
}
