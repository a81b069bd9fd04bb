//! The watched-targets file.
//!
//! ```json
//! {
//!   "default_thresholds": {
//!     "cpu_utilization": { "warning": 80, "critical": 90, "direction": "high_is_bad" },
//!     "free_storage_gb": { "warning": 20, "critical": 5, "direction": "low_is_bad" }
//!   },
//!   "targets": [
//!     { "resource_id": "i-0abc", "resource_type": "compute_instance",
//!       "region_or_scope": "us-east-1", "metric_name": "cpu_utilization" },
//!     { "resource_id": "orders-db", "resource_type": "managed_database",
//!       "region_or_scope": "eu-west-1", "metric_name": "free_storage_gb",
//!       "threshold_override": { "warning": 50, "critical": 10, "direction": "low_is_bad" } }
//!   ]
//! }
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use vigil_core::{Thresholds, WatchedTarget};
use vigil_monitor::MonitorConfig;

#[derive(Debug, thiserror::Error)]
pub enum TargetsFileError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Default, Deserialize)]
pub struct TargetsFile {
    #[serde(default)]
    pub default_thresholds: HashMap<String, Thresholds>,
    #[serde(default)]
    pub targets: Vec<WatchedTarget>,
}

impl TargetsFile {
    pub async fn load(path: &Path) -> Result<Self, TargetsFileError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| TargetsFileError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        serde_json::from_str(&raw).map_err(|source| TargetsFileError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Merge the file's default thresholds into `config`. File entries win
    /// over thresholds already present.
    pub fn apply_defaults(&self, mut config: MonitorConfig) -> MonitorConfig {
        for (metric, thresholds) in &self.default_thresholds {
            config = config.with_default_thresholds(metric.clone(), *thresholds);
        }
        config
    }
}
