//! Watched targets and the samples collected for them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::thresholds::Thresholds;
use crate::types::Timestamp;

/// Stable identity of a monitored (resource, metric) pair.
///
/// Used as the primary key of both the current-state table and the event
/// history, so it deliberately excludes the region/scope: moving a resource
/// between scopes does not reset its alert state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetKey {
    pub resource_id: String,
    pub resource_type: String,
    pub metric_name: String,
}

impl TargetKey {
    pub fn new(
        resource_id: impl Into<String>,
        resource_type: impl Into<String>,
        metric_name: impl Into<String>,
    ) -> Self {
        Self {
            resource_id: resource_id.into(),
            resource_type: resource_type.into(),
            metric_name: metric_name.into(),
        }
    }
}

impl fmt::Display for TargetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}:{}",
            self.resource_type, self.resource_id, self.metric_name
        )
    }
}

/// A (resource, metric) pair under active monitoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchedTarget {
    pub resource_id: String,
    /// Resource family, e.g. `"compute_instance"` or `"managed_database"`.
    pub resource_type: String,
    /// Region, project or account the resource lives in.
    #[serde(default)]
    pub region_or_scope: String,
    pub metric_name: String,
    /// Per-target thresholds; falls back to the configured default for the
    /// metric name when absent.
    #[serde(default)]
    pub threshold_override: Option<Thresholds>,
}

impl WatchedTarget {
    pub fn new(
        resource_id: impl Into<String>,
        resource_type: impl Into<String>,
        region_or_scope: impl Into<String>,
        metric_name: impl Into<String>,
    ) -> Self {
        Self {
            resource_id: resource_id.into(),
            resource_type: resource_type.into(),
            region_or_scope: region_or_scope.into(),
            metric_name: metric_name.into(),
            threshold_override: None,
        }
    }

    /// Attach a per-target threshold override.
    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.threshold_override = Some(thresholds);
        self
    }

    pub fn key(&self) -> TargetKey {
        TargetKey::new(
            self.resource_id.clone(),
            self.resource_type.clone(),
            self.metric_name.clone(),
        )
    }
}

/// One metric observation produced by a metric source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub value: f64,
    pub observed_at: Timestamp,
    pub resource_ref: TargetKey,
}
