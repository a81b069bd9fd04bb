//! Email notification delivery via SMTP.
//!
//! [`EmailChannel`] wraps the `lettre` async SMTP transport to send plain-text
//! alert emails. Configuration is loaded from environment variables; if
//! `SMTP_HOST` or `ALERT_EMAIL_TO` is not set, [`EmailConfig::from_env`]
//! returns `None` and no email channel should be constructed.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use vigil_core::NotificationEvent;

use crate::channel::{ChannelError, NotificationChannel};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for email delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),
}

// ---------------------------------------------------------------------------
// EmailConfig
// ---------------------------------------------------------------------------

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

/// Default sender address when `SMTP_FROM` is not set.
const DEFAULT_FROM_ADDRESS: &str = "alerts@vigil.local";

/// Configuration for the SMTP email channel.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// SMTP server hostname.
    pub smtp_host: String,
    /// SMTP server port (defaults to 587).
    pub smtp_port: u16,
    /// RFC 5322 "From" address.
    pub from_address: String,
    /// Recipients of every alert email.
    pub recipients: Vec<String>,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
}

impl EmailConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable         | Required | Default               |
    /// |------------------|----------|-----------------------|
    /// | `SMTP_HOST`      | yes      | --                    |
    /// | `ALERT_EMAIL_TO` | yes      | -- (comma-separated)  |
    /// | `SMTP_PORT`      | no       | `587`                 |
    /// | `SMTP_FROM`      | no       | `alerts@vigil.local`  |
    /// | `SMTP_USER`      | no       | --                    |
    /// | `SMTP_PASSWORD`  | no       | --                    |
    pub fn from_env() -> Option<Self> {
        let smtp_host = std::env::var("SMTP_HOST").ok()?;
        let recipients = parse_recipients(&std::env::var("ALERT_EMAIL_TO").ok()?);
        if recipients.is_empty() {
            return None;
        }
        Some(Self {
            smtp_host,
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            from_address: std::env::var("SMTP_FROM")
                .unwrap_or_else(|_| DEFAULT_FROM_ADDRESS.to_string()),
            recipients,
            smtp_user: std::env::var("SMTP_USER").ok(),
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
        })
    }
}

fn parse_recipients(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

// ---------------------------------------------------------------------------
// EmailChannel
// ---------------------------------------------------------------------------

/// Sends alert emails via SMTP.
pub struct EmailChannel {
    config: EmailConfig,
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl EmailChannel {
    /// Build the SMTP transport. No connection is opened until the first send.
    pub fn new(config: EmailConfig) -> Result<Self, EmailError> {
        let mut transport_builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
                .port(config.smtp_port);

        if let (Some(user), Some(pass)) = (&config.smtp_user, &config.smtp_password) {
            transport_builder =
                transport_builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            mailer: transport_builder.build(),
            config,
        })
    }

    fn build_message(&self, to: &str, event: &NotificationEvent) -> Result<Message, EmailError> {
        Message::builder()
            .from(self.config.from_address.parse()?)
            .to(to.parse()?)
            .subject(format!("[Vigil] {}", event.summary()))
            .header(ContentType::TEXT_PLAIN)
            .body(render_body(event))
            .map_err(|e| EmailError::Build(e.to_string()))
    }
}

fn render_body(event: &NotificationEvent) -> String {
    format!(
        "Resource: {} ({})\nScope: {}\nMetric: {}\nEvent: {}\n\
         Severity: {}\nValue: {}\nThreshold: {}\nTime: {}",
        event.resource_ref.resource_id,
        event.resource_ref.resource_type,
        event.region_or_scope,
        event.metric_name,
        event.kind,
        event.severity,
        event.value,
        event.threshold,
        event.timestamp,
    )
}

#[async_trait]
impl NotificationChannel for EmailChannel {
    fn name(&self) -> &str {
        "email"
    }

    async fn send(&self, event: &NotificationEvent) -> Result<(), ChannelError> {
        for to in &self.config.recipients {
            let message = self.build_message(to, event)?;
            self.mailer.send(message).await.map_err(EmailError::from)?;
            tracing::info!(
                to = %to,
                kind = %event.kind,
                resource_id = %event.resource_ref.resource_id,
                "Alert email sent"
            );
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
