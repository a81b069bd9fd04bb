//! Generic HTTP JSON metric source.
//!
//! Vendor collectors (cloud monitoring exporters, cluster REST pollers,
//! warehouse query checks) expose the latest value of each metric at
//! `GET {base_url}/metrics` and the engine reads it from there:
//!
//! ```text
//! GET /metrics?resource_type=compute_instance&resource_id=i-1&scope=us-east-1
//!             &metric=cpu_utilization&window_secs=300
//! 200 {"value": 87.5, "observed_at": "2024-03-01T12:00:00Z"}
//! ```
//!
//! A `404` means the resource is gone; `observed_at` is optional.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::StatusCode;
use serde::Deserialize;
use vigil_core::types::Timestamp;
use vigil_core::{Sample, WatchedTarget};

use crate::source::{MetricSource, SourceError};

/// HTTP request timeout; the scheduler applies its own fetch timeout too.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct MetricResponse {
    value: f64,
    #[serde(default)]
    observed_at: Option<Timestamp>,
}

/// Reads samples from a collector's HTTP endpoint.
pub struct HttpMetricSource {
    base_url: String,
    client: reqwest::Client,
}

impl HttpMetricSource {
    pub fn new(base_url: impl Into<String>) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/metrics", self.base_url)
    }
}

#[async_trait]
impl MetricSource for HttpMetricSource {
    async fn fetch(&self, target: &WatchedTarget, window: Duration) -> Result<Sample, SourceError> {
        let window_secs = window.as_secs().to_string();
        let response = self
            .client
            .get(self.endpoint())
            .query(&[
                ("resource_type", target.resource_type.as_str()),
                ("resource_id", target.resource_id.as_str()),
                ("scope", target.region_or_scope.as_str()),
                ("metric", target.metric_name.as_str()),
                ("window_secs", window_secs.as_str()),
            ])
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => return Err(SourceError::NotFound(target.key().to_string())),
            status if !status.is_success() => {
                return Err(SourceError::Unavailable(format!(
                    "collector returned HTTP {}",
                    status.as_u16()
                )))
            }
            _ => {}
        }

        let body: MetricResponse = response.json().await?;
        Ok(Sample {
            value: body.value,
            observed_at: body.observed_at.unwrap_or_else(Utc::now),
            resource_ref: target.key(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let source = HttpMetricSource::new("http://collector:9100/").unwrap();
        assert_eq!(source.endpoint(), "http://collector:9100/metrics");
    }

    #[test]
    fn response_without_timestamp_parses() {
        let body: MetricResponse = serde_json::from_str(r#"{"value": 12.5}"#).unwrap();
        assert_eq!(body.value, 12.5);
        assert!(body.observed_at.is_none());
    }
}
