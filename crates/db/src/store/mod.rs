//! The alert store contract.

use async_trait::async_trait;
use vigil_core::types::Timestamp;
use vigil_core::{AlertRecord, CoreError, EventKind, NotificationEvent, TargetKey};

pub mod memory;
pub mod sqlite;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The underlying database rejected or failed a query.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Embedded migrations could not be applied.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored row could not be converted back into a domain value.
    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

impl From<CoreError> for StoreError {
    fn from(err: CoreError) -> Self {
        StoreError::Corrupt(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// HistoryFilter
// ---------------------------------------------------------------------------

/// Optional predicates for [`AlertStore::list_history`]. Results are newest first.
#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    pub resource_id: Option<String>,
    pub resource_type: Option<String>,
    pub metric_name: Option<String>,
    pub kind: Option<EventKind>,
    pub since: Option<Timestamp>,
    pub limit: Option<usize>,
}

impl HistoryFilter {
    /// Match every event of one target.
    pub fn for_target(key: &TargetKey) -> Self {
        Self {
            resource_id: Some(key.resource_id.clone()),
            resource_type: Some(key.resource_type.clone()),
            metric_name: Some(key.metric_name.clone()),
            ..Self::default()
        }
    }

    pub fn with_kind(mut self, kind: EventKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn since(mut self, since: Timestamp) -> Self {
        self.since = Some(since);
        self
    }

    /// In-process evaluation of the filter (limit excluded).
    pub fn matches(&self, event: &NotificationEvent) -> bool {
        let key = &event.resource_ref;
        self.resource_id.as_ref().map_or(true, |v| *v == key.resource_id)
            && self.resource_type.as_ref().map_or(true, |v| *v == key.resource_type)
            && self.metric_name.as_ref().map_or(true, |v| *v == key.metric_name)
            && self.kind.map_or(true, |k| k == event.kind)
            && self.since.map_or(true, |s| event.timestamp >= s)
    }
}

// ---------------------------------------------------------------------------
// AlertStore
// ---------------------------------------------------------------------------

/// Durable alert state: a keyed current-state table plus an append-only
/// event history.
///
/// Implementations synchronize internally; callers share them as
/// `Arc<dyn AlertStore>`.
#[async_trait]
pub trait AlertStore: Send + Sync {
    /// Append one event to history.
    async fn append(&self, event: &NotificationEvent) -> Result<(), StoreError>;

    /// Current state for a target, or a fresh Normal record when none is stored.
    async fn get_current_state(&self, key: &TargetKey) -> Result<AlertRecord, StoreError>;

    /// Insert or replace the current state for the record's key.
    async fn put_current_state(&self, record: &AlertRecord) -> Result<(), StoreError>;

    /// Persist a state change and, if present, its event as one unit.
    ///
    /// The default writes state first, so a failed append still leaves the
    /// state durable. The SQLite store overrides this with a transaction.
    async fn record_transition(
        &self,
        record: &AlertRecord,
        event: Option<&NotificationEvent>,
    ) -> Result<(), StoreError> {
        self.put_current_state(record).await?;
        if let Some(event) = event {
            self.append(event).await?;
        }
        Ok(())
    }

    /// Every stored record, used to rebuild in-memory state after a restart.
    async fn list_current_states(&self) -> Result<Vec<AlertRecord>, StoreError>;

    /// Forget the current state of one target. History is kept.
    async fn remove_current_state(&self, key: &TargetKey) -> Result<(), StoreError>;

    /// Events matching the filter, newest first.
    async fn list_history(&self, filter: &HistoryFilter)
        -> Result<Vec<NotificationEvent>, StoreError>;

    /// Truncate history and drop all current state. Operator action only.
    async fn clear_all(&self) -> Result<(), StoreError>;
}
