use std::collections::HashMap;

use tokio::sync::RwLock;
use vigil_core::{CoreError, TargetKey, Thresholds, WatchedTarget};

/// The set of watched targets, keyed by [`TargetKey`].
///
/// Thread-safe via interior `RwLock`; registration can run while a tick is
/// iterating its own snapshot.
pub struct TargetRegistry {
    targets: RwLock<HashMap<TargetKey, WatchedTarget>>,
}

impl TargetRegistry {
    pub fn new() -> Self {
        Self {
            targets: RwLock::new(HashMap::new()),
        }
    }

    /// Insert or replace a target.
    ///
    /// Returns the previous registration for the same key, if any.
    pub async fn add(&self, target: WatchedTarget) -> Option<WatchedTarget> {
        self.targets.write().await.insert(target.key(), target)
    }

    pub async fn remove(&self, key: &TargetKey) -> Option<WatchedTarget> {
        self.targets.write().await.remove(key)
    }

    /// Replace the per-target threshold override. `None` reverts the target
    /// to the configured default for its metric.
    pub async fn set_threshold_override(
        &self,
        key: &TargetKey,
        thresholds: Option<Thresholds>,
    ) -> Result<(), CoreError> {
        let mut targets = self.targets.write().await;
        let target = targets.get_mut(key).ok_or_else(|| CoreError::NotFound {
            entity: "WatchedTarget",
            key: key.to_string(),
        })?;
        target.threshold_override = thresholds;
        Ok(())
    }

    pub async fn contains(&self, key: &TargetKey) -> bool {
        self.targets.read().await.contains_key(key)
    }

    pub async fn get(&self, key: &TargetKey) -> Option<WatchedTarget> {
        self.targets.read().await.get(key).cloned()
    }

    /// Copy of every registration, ordered by key.
    pub async fn snapshot(&self) -> Vec<WatchedTarget> {
        let mut targets: Vec<_> = self.targets.read().await.values().cloned().collect();
        targets.sort_by_key(|t| t.key());
        targets
    }

    pub async fn len(&self) -> usize {
        self.targets.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.targets.read().await.is_empty()
    }
}

impl Default for TargetRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn target(id: &str) -> WatchedTarget {
        WatchedTarget::new(id, "compute_instance", "us-east-1", "cpu_utilization")
    }

    #[tokio::test]
    async fn add_replaces_same_key() {
        let registry = TargetRegistry::new();
        assert!(registry.add(target("i-1")).await.is_none());
        let replaced = registry
            .add(target("i-1").with_thresholds(Thresholds::high_is_bad(50.0, 60.0)))
            .await;
        assert!(replaced.is_some());
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn snapshot_is_sorted_and_detached() {
        let registry = TargetRegistry::new();
        registry.add(target("i-2")).await;
        registry.add(target("i-1")).await;

        let snapshot = registry.snapshot().await;
        registry.remove(&target("i-1").key()).await;

        let ids: Vec<_> = snapshot.iter().map(|t| t.resource_id.as_str()).collect();
        assert_eq!(ids, vec!["i-1", "i-2"]);
        assert!(!registry.contains(&target("i-1").key()).await);
    }

    #[tokio::test]
    async fn override_on_unknown_target_is_not_found() {
        let registry = TargetRegistry::new();
        let result = registry
            .set_threshold_override(&target("i-9").key(), None)
            .await;
        assert_matches!(result, Err(CoreError::NotFound { .. }));
    }
}
