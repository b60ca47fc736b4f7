//! Notification error types.

use thiserror::Error;

/// Errors that can occur while delivering a notification.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The transport accepted the request but refused the message.
    #[error("Delivery to {to} failed: {reason}")]
    Delivery { to: String, reason: String },

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl NotifyError {
    /// Creates a delivery error.
    pub fn delivery(to: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Delivery {
            to: to.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for notification operations.
pub type NotifyResult<T> = Result<T, NotifyError>;
