//! Webhook delivery with bounded exponential-backoff retry.
//!
//! [`WebhookChannel`] POSTs a JSON-encoded [`NotificationEvent`] to a chat or
//! incident webhook. Failed attempts are retried after 1 s, 2 s and 4 s; the
//! event is then given up on.
//!
//! Each attempt is capped at 3 s, so the full schedule (4 attempts plus 7 s of
//! backoff) finishes inside the notifier's default 20 s per-channel timeout.
//! A shorter delivery timeout cuts the later retries off.

use std::time::Duration;

use async_trait::async_trait;
use vigil_core::NotificationEvent;

use crate::channel::{ChannelError, NotificationChannel};

/// Backoff before each retry (exponential: 1s, 2s, 4s).
const RETRY_DELAYS: [Duration; 3] = [
    Duration::from_secs(1),
    Duration::from_secs(2),
    Duration::from_secs(4),
];

/// HTTP request timeout for a single delivery attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(3);

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for webhook delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The remote server returned a non-2xx status code.
    #[error("Webhook returned HTTP {0}")]
    HttpStatus(u16),
}

// ---------------------------------------------------------------------------
// WebhookChannel
// ---------------------------------------------------------------------------

/// Delivers alert notifications to one webhook endpoint.
pub struct WebhookChannel {
    url: String,
    client: reqwest::Client,
    request_timeout: Duration,
    retry_delays: Vec<Duration>,
}

impl WebhookChannel {
    /// Create a channel with a pre-configured HTTP client.
    pub fn new(url: impl Into<String>) -> Result<Self, WebhookError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            url: url.into(),
            client,
            request_timeout: REQUEST_TIMEOUT,
            retry_delays: RETRY_DELAYS.to_vec(),
        })
    }

    /// Override the retry backoff schedule. An empty schedule disables retries.
    pub fn with_retry_delays(mut self, delays: Vec<Duration>) -> Self {
        self.retry_delays = delays;
        self
    }

    /// Longest a delivery can take when every attempt times out.
    pub fn worst_case_duration(&self) -> Duration {
        let attempts = self.retry_delays.len() as u32 + 1;
        self.request_timeout * attempts + self.retry_delays.iter().sum::<Duration>()
    }

    /// Deliver with retry, returning the last error once every attempt failed.
    async fn deliver(&self, payload: &serde_json::Value) -> Result<(), WebhookError> {
        let mut last_err = match self.try_send(payload).await {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };

        for (attempt, delay) in self.retry_delays.iter().enumerate() {
            tracing::warn!(
                attempt = attempt + 1,
                url = %self.url,
                error = %last_err,
                "Webhook delivery attempt failed, retrying"
            );
            tokio::time::sleep(*delay).await;
            match self.try_send(payload).await {
                Ok(()) => return Ok(()),
                Err(e) => last_err = e,
            }
        }

        tracing::error!(
            url = %self.url,
            error = %last_err,
            "Webhook delivery failed after all retries"
        );
        Err(last_err)
    }

    /// Execute a single POST request and check the response status.
    async fn try_send(&self, payload: &serde_json::Value) -> Result<(), WebhookError> {
        let response = self.client.post(&self.url).json(payload).send().await?;
        if !response.status().is_success() {
            return Err(WebhookError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }
}

fn payload(event: &NotificationEvent) -> serde_json::Value {
    serde_json::json!({
        "text": event.summary(),
        "event": event,
    })
}

#[async_trait]
impl NotificationChannel for WebhookChannel {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn send(&self, event: &NotificationEvent) -> Result<(), ChannelError> {
        self.deliver(&payload(event)).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
