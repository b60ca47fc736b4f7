//! Notifier that posts messages to an HTTP endpoint.

use std::time::Duration;

use async_trait::async_trait;
use entities::Incident;
use serde::{Deserialize, Serialize};

use crate::{NotificationKind, Notifier, NotifyError, NotifyResult, render_message};

/// Default request timeout for webhook deliveries.
pub const DEFAULT_WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// JSON body posted for each notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookPayload {
    /// Recipient address.
    pub to: String,
    /// Lifecycle event.
    pub kind: NotificationKind,
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    pub body: String,
    /// Incident snapshot at the time of the transition.
    pub incident: Incident,
}

/// Notifier that delivers each message as a JSON POST, for relays that turn
/// webhooks into email or chat messages.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    /// Endpoint URL.
    url: String,
    /// HTTP client
    http_client: reqwest::Client,
}

impl WebhookNotifier {
    /// Creates a webhook notifier with the default timeout.
    pub fn new(url: impl Into<String>) -> NotifyResult<Self> {
        Self::with_timeout(url, DEFAULT_WEBHOOK_TIMEOUT)
    }

    /// Creates a webhook notifier with a custom request timeout.
    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> NotifyResult<Self> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: url.into(),
            http_client,
        })
    }

    /// Returns the endpoint URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(
        &self,
        to: &str,
        kind: NotificationKind,
        incident: &Incident,
    ) -> NotifyResult<()> {
        let message = render_message(kind, incident);
        let payload = WebhookPayload {
            to: to.to_string(),
            kind,
            subject: message.subject,
            body: message.body,
            incident: incident.clone(),
        };

        tracing::debug!(url = %self.url, to = %to, kind = %kind, "Posting notification");

        let response = self
            .http_client
            .post(&self.url)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(NotifyError::delivery(
                to,
                format!("webhook returned status {}", response.status()),
            ));
        }

        Ok(())
    }
}
