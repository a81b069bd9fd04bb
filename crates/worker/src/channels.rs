//! Notification channels enabled by the environment.
//!
//! | Variable            | Effect                                          |
//! |---------------------|-------------------------------------------------|
//! | `SMTP_HOST` + `ALERT_EMAIL_TO` | enables the email channel (see [`EmailConfig::from_env`]) |
//! | `ALERT_WEBHOOK_URL` | enables the webhook channel                     |
//!
//! The in-process bus channel is always enabled so pub/sub bridges can
//! subscribe to [`ALERT_TOPIC`].

use std::sync::Arc;

use vigil_events::delivery::email::EmailError;
use vigil_events::delivery::webhook::WebhookError;
use vigil_events::{
    BusChannel, EmailChannel, EmailConfig, EventBus, NotificationChannel, WebhookChannel,
};

pub const ALERT_TOPIC: &str = "alerts";

#[derive(Debug, thiserror::Error)]
pub enum ChannelSetupError {
    #[error("Email channel misconfigured: {0}")]
    Email(#[from] EmailError),

    #[error("Webhook channel misconfigured: {0}")]
    Webhook(#[from] WebhookError),
}

/// Build every channel the environment enables, plus the bus channel.
pub fn channels_from_env(
    bus: Arc<EventBus>,
) -> Result<Vec<Arc<dyn NotificationChannel>>, ChannelSetupError> {
    let webhook_url = std::env::var("ALERT_WEBHOOK_URL")
        .ok()
        .filter(|url| !url.trim().is_empty());
    build_channels(EmailConfig::from_env(), webhook_url, bus)
}

pub fn build_channels(
    email: Option<EmailConfig>,
    webhook_url: Option<String>,
    bus: Arc<EventBus>,
) -> Result<Vec<Arc<dyn NotificationChannel>>, ChannelSetupError> {
    let mut channels: Vec<Arc<dyn NotificationChannel>> = Vec::new();

    if let Some(config) = email {
        tracing::info!(
            smtp_host = %config.smtp_host,
            recipients = config.recipients.len(),
            "Email channel enabled"
        );
        channels.push(Arc::new(EmailChannel::new(config)?));
    }

    if let Some(url) = webhook_url {
        tracing::info!("Webhook channel enabled");
        channels.push(Arc::new(WebhookChannel::new(url)?));
    }

    channels.push(Arc::new(BusChannel::new(ALERT_TOPIC, bus)));
    Ok(channels)
}
