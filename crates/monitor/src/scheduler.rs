//! The polling scheduler.
//!
//! Each tick snapshots the registry and processes every target independently:
//!
//! 1. resolve thresholds (override, else the configured default),
//! 2. fetch a sample under the fetch timeout,
//! 3. re-check registry membership,
//! 4. classify the value,
//! 5. under the per-key lock: transition, persist, then enqueue the event.
//!
//! A failure at any step affects that target only. Persistence failures
//! leave the in-memory record untouched and nothing is dispatched, so the
//! next tick retries the same transition.

use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use vigil_core::state_machine::{self, Observation};
use vigil_core::thresholds::evaluate;
use vigil_core::types::Timestamp;
use vigil_core::{AlertRecord, CoreError, NotificationEvent, TargetKey, Thresholds, WatchedTarget};
use vigil_db::{AlertStore, HistoryFilter};
use vigil_events::NotifierHandle;

use crate::config::{MonitorConfig, MIN_POLL_INTERVAL};
use crate::error::MonitorError;
use crate::registry::TargetRegistry;
use crate::source::{MetricSource, SourceError};
use crate::state_table::AlertStateTable;

// ---------------------------------------------------------------------------
// Status and reports
// ---------------------------------------------------------------------------

/// Health of the monitoring pipeline itself, separate from resource alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MonitorStatus {
    #[default]
    Healthy,
    /// The last tick could not evaluate every target.
    Degraded {
        sampling_failures: usize,
        config_errors: usize,
        persistence_failures: usize,
    },
}

impl MonitorStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, MonitorStatus::Healthy)
    }
}

/// Outcome of one tick.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    /// Targets in the registry snapshot.
    pub targets: usize,
    /// Targets whose observation was applied and persisted.
    pub evaluated: usize,
    pub sampling_failures: usize,
    /// Targets excluded for missing or invalid thresholds.
    pub config_errors: usize,
    pub persistence_failures: usize,
    /// Samples dropped because the target was removed mid-fetch.
    pub discarded: usize,
    /// Events persisted this tick, ordered by target key.
    pub events: Vec<NotificationEvent>,
}

impl TickReport {
    pub fn status(&self) -> MonitorStatus {
        if self.sampling_failures == 0 && self.config_errors == 0 && self.persistence_failures == 0
        {
            MonitorStatus::Healthy
        } else {
            MonitorStatus::Degraded {
                sampling_failures: self.sampling_failures,
                config_errors: self.config_errors,
                persistence_failures: self.persistence_failures,
            }
        }
    }

    fn record(&mut self, outcome: TargetOutcome) {
        match outcome {
            TargetOutcome::Evaluated(event) => {
                self.evaluated += 1;
                self.events.extend(event);
            }
            TargetOutcome::SamplingFailure => self.sampling_failures += 1,
            TargetOutcome::ConfigError => self.config_errors += 1,
            TargetOutcome::PersistenceFailure => self.persistence_failures += 1,
            TargetOutcome::Discarded => self.discarded += 1,
        }
    }
}

enum TargetOutcome {
    Evaluated(Option<NotificationEvent>),
    SamplingFailure,
    ConfigError,
    PersistenceFailure,
    Discarded,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Drives polling, evaluation, persistence and notification for every
/// watched target.
///
/// Designed to be wrapped in `Arc` and shared between the driver loop and
/// whatever exposes the registration API.
pub struct Scheduler {
    config: MonitorConfig,
    registry: TargetRegistry,
    states: AlertStateTable,
    store: Arc<dyn AlertStore>,
    source: Arc<dyn MetricSource>,
    notifier: NotifierHandle,
    status: watch::Sender<MonitorStatus>,
    /// Serializes ticks so transitions for a key follow tick order.
    tick_lock: Mutex<()>,
}

impl Scheduler {
    pub fn new(
        config: MonitorConfig,
        store: Arc<dyn AlertStore>,
        source: Arc<dyn MetricSource>,
        notifier: NotifierHandle,
    ) -> Self {
        let (status, _) = watch::channel(MonitorStatus::Healthy);
        Self {
            config,
            registry: TargetRegistry::new(),
            states: AlertStateTable::new(),
            store,
            source,
            notifier,
            status,
            tick_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Reload every persisted alert record into memory.
    ///
    /// Call once at startup so sustained conditions are not re-announced as
    /// new triggers after a restart.
    pub async fn restore(&self) -> Result<usize, MonitorError> {
        let records = self.store.list_current_states().await?;
        let alerting = records.iter().filter(|r| r.is_alerting()).count();
        let loaded = self.states.load(records).await;
        tracing::info!(records = loaded, alerting, "Alert state restored");
        Ok(loaded)
    }

    // -- Registration -------------------------------------------------------

    /// Start watching a target. Re-adding an existing key replaces its
    /// registration and keeps its alert state.
    ///
    /// Rejected when the target has neither a valid override nor a
    /// configured default for its metric.
    pub async fn add_target(&self, target: WatchedTarget) -> Result<(), MonitorError> {
        let key = target.key();
        if let Err(e) = self.resolve_thresholds(&target) {
            tracing::error!(key = %key, error = %e, "Watched target rejected");
            return Err(e.into());
        }
        let scope = target.region_or_scope.clone();
        match self.registry.add(target).await {
            Some(_) => tracing::info!(key = %key, scope = %scope, "Watched target updated"),
            None => tracing::info!(key = %key, scope = %scope, "Watched target added"),
        }
        Ok(())
    }

    /// Stop watching a target and drop its current alert state.
    ///
    /// History is kept. An in-flight fetch for the target is discarded.
    pub async fn remove_target(&self, key: &TargetKey) -> Result<WatchedTarget, MonitorError> {
        let removed = self
            .registry
            .remove(key)
            .await
            .ok_or_else(|| CoreError::NotFound {
                entity: "WatchedTarget",
                key: key.to_string(),
            })?;

        let store = self.store.clone();
        self.states
            .remove_with(key, || async move { store.remove_current_state(key).await })
            .await?;

        tracing::info!(key = %key, "Watched target removed");
        Ok(removed)
    }

    /// Replace a target's threshold override with `thresholds`.
    pub async fn update_threshold(
        &self,
        key: &TargetKey,
        thresholds: Thresholds,
    ) -> Result<(), MonitorError> {
        self.set_threshold_override(key, Some(thresholds)).await
    }

    /// Set or clear a target's threshold override. Takes effect on the next
    /// tick.
    pub async fn set_threshold_override(
        &self,
        key: &TargetKey,
        thresholds: Option<Thresholds>,
    ) -> Result<(), MonitorError> {
        if let Some(t) = &thresholds {
            t.validate(&key.metric_name)?;
        }
        let unresolved =
            thresholds.is_none() && !self.config.default_thresholds.contains_key(&key.metric_name);
        self.registry.set_threshold_override(key, thresholds).await?;
        if unresolved {
            tracing::error!(
                key = %key,
                "Threshold override cleared with no default, target excluded from evaluation"
            );
        } else {
            tracing::info!(key = %key, "Threshold override updated");
        }
        Ok(())
    }

    pub async fn list_targets(&self) -> Vec<WatchedTarget> {
        self.registry.snapshot().await
    }

    /// Every tracked record, alerting or not, ordered by key.
    pub async fn list_alert_states(&self) -> Vec<AlertRecord> {
        self.states.snapshot().await
    }

    /// Records currently in Warning or Critical, ordered by key.
    pub async fn list_current_alerts(&self) -> Vec<AlertRecord> {
        self.states
            .snapshot()
            .await
            .into_iter()
            .filter(AlertRecord::is_alerting)
            .collect()
    }

    /// Reset all alert state and truncate history. Operator action only.
    pub async fn clear_all_alerts(&self) -> Result<(), MonitorError> {
        let store = self.store.clone();
        let reset = self
            .states
            .reset_with(|| async move { store.clear_all().await })
            .await?;
        tracing::warn!(reset, "All alert state and history cleared");
        Ok(())
    }

    /// Events from the store's history, newest first.
    pub async fn history(
        &self,
        filter: &HistoryFilter,
    ) -> Result<Vec<NotificationEvent>, MonitorError> {
        Ok(self.store.list_history(filter).await?)
    }

    /// Watch the monitoring pipeline's own health.
    pub fn subscribe_status(&self) -> watch::Receiver<MonitorStatus> {
        self.status.subscribe()
    }

    pub fn status(&self) -> MonitorStatus {
        *self.status.borrow()
    }

    // -- Ticks --------------------------------------------------------------

    /// Poll on the configured interval until `cancel` fires.
    ///
    /// Ticks that fall behind are skipped rather than bunched up. A tick in
    /// progress when `cancel` fires runs to completion. The interval is never
    /// shorter than [`MIN_POLL_INTERVAL`].
    pub async fn run(&self, cancel: CancellationToken) {
        let poll_interval = self.config.effective_poll_interval();
        if poll_interval != self.config.poll_interval {
            tracing::warn!(
                configured_ms = self.config.poll_interval.as_millis() as u64,
                poll_interval_ms = MIN_POLL_INTERVAL.as_millis() as u64,
                "Poll interval too short, clamped"
            );
        }
        let targets = self.registry.len().await;
        tracing::info!(
            poll_interval_secs = poll_interval.as_secs(),
            reminder_interval_secs = self.config.reminder_interval.as_secs(),
            targets = targets,
            "Scheduler started"
        );

        let mut interval = tokio::time::interval(poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Scheduler stopping");
                    break;
                }
                _ = interval.tick() => {
                    self.tick_at(Utc::now()).await;
                }
            }
        }
    }

    /// Run a single tick with `now` as the evaluation time.
    pub async fn tick_at(&self, now: Timestamp) -> TickReport {
        let _tick = self.tick_lock.lock().await;

        let targets = self.registry.snapshot().await;
        let mut report = TickReport {
            targets: targets.len(),
            ..Default::default()
        };

        let outcomes: Vec<TargetOutcome> = stream::iter(targets)
            .map(move |target| self.process_target(target, now))
            .buffer_unordered(self.config.max_concurrent_fetches.max(1))
            .collect()
            .await;
        for outcome in outcomes {
            report.record(outcome);
        }
        report.events.sort_by(|a, b| a.resource_ref.cmp(&b.resource_ref));

        tracing::debug!(
            targets = report.targets,
            evaluated = report.evaluated,
            events = report.events.len(),
            sampling_failures = report.sampling_failures,
            config_errors = report.config_errors,
            persistence_failures = report.persistence_failures,
            discarded = report.discarded,
            "Tick complete"
        );
        self.publish_status(report.status());
        report
    }

    fn publish_status(&self, status: MonitorStatus) {
        let previous = self.status.send_replace(status);
        if status == previous {
            return;
        }
        match status {
            MonitorStatus::Degraded {
                sampling_failures,
                config_errors,
                persistence_failures,
            } if previous.is_healthy() => {
                tracing::warn!(
                    sampling_failures,
                    config_errors,
                    persistence_failures,
                    "Monitoring degraded"
                );
            }
            MonitorStatus::Healthy => tracing::info!("Monitoring healthy again"),
            MonitorStatus::Degraded { .. } => {}
        }
    }

    fn resolve_thresholds(&self, target: &WatchedTarget) -> Result<Thresholds, CoreError> {
        let thresholds = target
            .threshold_override
            .or_else(|| self.config.default_thresholds.get(&target.metric_name).copied())
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "no thresholds configured for metric {}",
                    target.metric_name
                ))
            })?;
        thresholds.validate(&target.metric_name)?;
        Ok(thresholds)
    }

    async fn fetch(&self, target: &WatchedTarget) -> Result<vigil_core::Sample, SourceError> {
        let fetch = self.source.fetch(target, self.config.metric_window);
        match tokio::time::timeout(self.config.fetch_timeout, fetch).await {
            Ok(result) => result,
            Err(_) => Err(SourceError::Timeout(self.config.fetch_timeout)),
        }
    }

    async fn process_target(&self, target: WatchedTarget, now: Timestamp) -> TargetOutcome {
        let key = target.key();

        let thresholds = match self.resolve_thresholds(&target) {
            Ok(thresholds) => thresholds,
            Err(e) => {
                tracing::error!(key = %key, error = %e, "Target excluded from evaluation");
                return TargetOutcome::ConfigError;
            }
        };

        let sample = match self.fetch(&target).await {
            Ok(sample) => sample,
            Err(e) => {
                tracing::warn!(
                    key = %key,
                    scope = %target.region_or_scope,
                    error = %e,
                    "Sampling failed"
                );
                return TargetOutcome::SamplingFailure;
            }
        };

        // Thresholds were validated above, so only the value can be rejected.
        let severity = match evaluate(&key.metric_name, sample.value, Some(&thresholds)) {
            Ok(severity) => severity,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Unusable sample");
                return TargetOutcome::SamplingFailure;
            }
        };

        // Skip the state load for a target removed while its fetch ran.
        if !self.registry.contains(&key).await {
            tracing::debug!(key = %key, "Target removed during fetch, sample discarded");
            return TargetOutcome::Discarded;
        }

        let store = self.store.clone();
        let load_key = key.clone();
        let slot = match self
            .states
            .slot_or_load(&key, || async move { store.get_current_state(&load_key).await })
            .await
        {
            Ok(slot) => slot,
            Err(e) => {
                tracing::error!(key = %key, error = %e, "Failed to load alert state");
                return TargetOutcome::PersistenceFailure;
            }
        };
        let mut record = slot.lock().await;

        // Checked again under the record lock: removal takes the same lock
        // before dropping the stored state.
        if !self.registry.contains(&key).await {
            drop(record);
            self.states.remove_if_same(&key, &slot).await;
            tracing::debug!(key = %key, "Target removed during fetch, sample discarded");
            return TargetOutcome::Discarded;
        }

        let transition = state_machine::transition(
            &record,
            Observation {
                severity,
                value: sample.value,
                thresholds: &thresholds,
                region_or_scope: &target.region_or_scope,
                now,
            },
            self.config.reminder_interval_chrono(),
        );

        if let Err(e) = self
            .store
            .record_transition(&transition.record, transition.event.as_ref())
            .await
        {
            tracing::error!(key = %key, error = %e, "Failed to persist alert state");
            return TargetOutcome::PersistenceFailure;
        }
        *record = transition.record;
        drop(record);

        if let Some(event) = &transition.event {
            tracing::info!(
                key = %key,
                kind = %event.kind,
                severity = %event.severity,
                value = event.value,
                threshold = event.threshold,
                "Alert event"
            );
            self.notifier.enqueue(event.clone());
        }
        TargetOutcome::Evaluated(transition.event)
    }
}
