//! The metric source seam.
//!
//! One implementation per resource family (compute instance, managed
//! database, cluster node, warehouse query engine). Vendor-specific logic
//! stays inside the implementation; the engine only sees a number and a
//! timestamp, or an explicit failure.

use std::time::Duration;

use async_trait::async_trait;
use vigil_core::{Sample, WatchedTarget};

/// Error type for a failed sample fetch.
///
/// Every variant is a sampling failure: the target is skipped for the tick
/// and its alert state is left untouched.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The source did not answer within the fetch timeout.
    #[error("Metric fetch timed out after {0:?}")]
    Timeout(Duration),

    /// The resource or metric no longer exists upstream.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// The upstream API call failed.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Authentication, throttling, missing datapoints and the like.
    #[error("Metric source unavailable: {0}")]
    Unavailable(String),
}

/// Produces current samples for watched targets.
#[async_trait]
pub trait MetricSource: Send + Sync {
    /// Fetch the latest value of `target`'s metric over `window`.
    async fn fetch(&self, target: &WatchedTarget, window: Duration) -> Result<Sample, SourceError>;
}
