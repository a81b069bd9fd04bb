//! The notification channel seam.

use std::time::Duration;

use async_trait::async_trait;
use vigil_core::NotificationEvent;

use crate::delivery::email::EmailError;
use crate::delivery::webhook::WebhookError;

/// Error type for a single channel delivery attempt.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error(transparent)]
    Email(#[from] EmailError),

    #[error(transparent)]
    Webhook(#[from] WebhookError),

    /// The channel did not finish within the per-channel delivery timeout.
    #[error("Delivery timed out after {0:?}")]
    Timeout(Duration),

    /// Any other transport-specific failure.
    #[error("Delivery failed: {0}")]
    Other(String),
}

/// A destination notifications can be delivered to.
///
/// Implementations hold their own destination configuration (address,
/// webhook URL, topic). A failure must only affect this channel.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Short stable name used in logs, e.g. `"email"` or `"webhook"`.
    fn name(&self) -> &str;

    /// Deliver one event.
    async fn send(&self, event: &NotificationEvent) -> Result<(), ChannelError>;
}
