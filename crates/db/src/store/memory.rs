//! In-memory [`AlertStore`]. Not durable; state is lost with the process.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use vigil_core::{AlertRecord, NotificationEvent, TargetKey};

use crate::store::{AlertStore, HistoryFilter, StoreError};

#[derive(Debug, Default)]
struct Inner {
    records: BTreeMap<TargetKey, AlertRecord>,
    events: Vec<NotificationEvent>,
}

/// Store backed by process memory.
#[derive(Debug, Default)]
pub struct MemoryAlertStore {
    inner: Mutex<Inner>,
}

impl MemoryAlertStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of events in history.
    pub async fn event_count(&self) -> usize {
        self.inner.lock().await.events.len()
    }
}

#[async_trait]
impl AlertStore for MemoryAlertStore {
    async fn append(&self, event: &NotificationEvent) -> Result<(), StoreError> {
        self.inner.lock().await.events.push(event.clone());
        Ok(())
    }

    async fn get_current_state(&self, key: &TargetKey) -> Result<AlertRecord, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .records
            .get(key)
            .cloned()
            .unwrap_or_else(|| AlertRecord::normal(key.clone())))
    }

    async fn put_current_state(&self, record: &AlertRecord) -> Result<(), StoreError> {
        self.inner
            .lock()
            .await
            .records
            .insert(record.key.clone(), record.clone());
        Ok(())
    }

    async fn record_transition(
        &self,
        record: &AlertRecord,
        event: Option<&NotificationEvent>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.records.insert(record.key.clone(), record.clone());
        if let Some(event) = event {
            inner.events.push(event.clone());
        }
        Ok(())
    }

    async fn list_current_states(&self) -> Result<Vec<AlertRecord>, StoreError> {
        Ok(self.inner.lock().await.records.values().cloned().collect())
    }

    async fn remove_current_state(&self, key: &TargetKey) -> Result<(), StoreError> {
        self.inner.lock().await.records.remove(key);
        Ok(())
    }

    async fn list_history(
        &self,
        filter: &HistoryFilter,
    ) -> Result<Vec<NotificationEvent>, StoreError> {
        let inner = self.inner.lock().await;
        let matching = inner.events.iter().rev().filter(|e| filter.matches(e)).cloned();
        Ok(match filter.limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        })
    }

    async fn clear_all(&self) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.records.clear();
        inner.events.clear();
        Ok(())
    }
}
