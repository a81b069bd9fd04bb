//! SQLite-backed [`AlertStore`].

use async_trait::async_trait;
use vigil_core::{AlertRecord, NotificationEvent, TargetKey};

use crate::repositories::{AlertRecordRepo, NotificationEventRepo};
use crate::store::{AlertStore, HistoryFilter, StoreError};
use crate::DbPool;

/// Durable store over a SQLite pool.
#[derive(Clone)]
pub struct SqliteAlertStore {
    pool: DbPool,
}

impl SqliteAlertStore {
    /// Wrap an already-migrated pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) the database at `database_url` and apply
    /// migrations.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = crate::create_pool(database_url).await?;
        crate::run_migrations(&pool).await?;
        tracing::debug!(database_url, "Alert store ready");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl AlertStore for SqliteAlertStore {
    async fn append(&self, event: &NotificationEvent) -> Result<(), StoreError> {
        NotificationEventRepo::insert(&self.pool, event).await?;
        Ok(())
    }

    async fn get_current_state(&self, key: &TargetKey) -> Result<AlertRecord, StoreError> {
        match AlertRecordRepo::find(&self.pool, key).await? {
            Some(row) => Ok(AlertRecord::try_from(row)?),
            None => Ok(AlertRecord::normal(key.clone())),
        }
    }

    async fn put_current_state(&self, record: &AlertRecord) -> Result<(), StoreError> {
        AlertRecordRepo::upsert(&self.pool, record).await?;
        Ok(())
    }

    async fn record_transition(
        &self,
        record: &AlertRecord,
        event: Option<&NotificationEvent>,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        AlertRecordRepo::upsert(&mut *tx, record).await?;
        if let Some(event) = event {
            NotificationEventRepo::insert(&mut *tx, event).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn list_current_states(&self) -> Result<Vec<AlertRecord>, StoreError> {
        AlertRecordRepo::list_all(&self.pool)
            .await?
            .into_iter()
            .map(|row| AlertRecord::try_from(row).map_err(StoreError::from))
            .collect()
    }

    async fn remove_current_state(&self, key: &TargetKey) -> Result<(), StoreError> {
        AlertRecordRepo::delete(&self.pool, key).await?;
        Ok(())
    }

    async fn list_history(
        &self,
        filter: &HistoryFilter,
    ) -> Result<Vec<NotificationEvent>, StoreError> {
        NotificationEventRepo::list(&self.pool, filter)
            .await?
            .into_iter()
            .map(|row| NotificationEvent::try_from(row).map_err(StoreError::from))
            .collect()
    }

    async fn clear_all(&self) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        let events = NotificationEventRepo::delete_all(&mut *tx).await?;
        let records = AlertRecordRepo::delete_all(&mut *tx).await?;
        tx.commit().await?;
        tracing::warn!(events, records, "Alert store cleared");
        Ok(())
    }
}
