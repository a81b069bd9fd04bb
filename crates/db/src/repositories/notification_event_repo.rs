//! Repository for the append-only `notification_events` table.

use sqlx::{QueryBuilder, Sqlite, SqliteExecutor};
use vigil_core::NotificationEvent;

use crate::models::alert::NotificationEventRow;
use crate::store::HistoryFilter;

/// Column list for `notification_events` queries.
const COLUMNS: &str = "\
    id, resource_id, resource_type, metric_name, region_or_scope, \
    kind, severity, value, threshold, occurred_at";

/// Provides query operations for notification history.
pub struct NotificationEventRepo;

impl NotificationEventRepo {
    /// Append one event. Returns the new row id.
    pub async fn insert(
        executor: impl SqliteExecutor<'_>,
        event: &NotificationEvent,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO notification_events \
                (resource_id, resource_type, metric_name, region_or_scope, \
                 kind, severity, value, threshold, occurred_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(&event.resource_ref.resource_id)
        .bind(&event.resource_ref.resource_type)
        .bind(&event.resource_ref.metric_name)
        .bind(&event.region_or_scope)
        .bind(event.kind.as_str())
        .bind(event.severity.as_str())
        .bind(event.value)
        .bind(event.threshold)
        .bind(event.timestamp)
        .execute(executor)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// List events matching the filter, newest first.
    pub async fn list(
        executor: impl SqliteExecutor<'_>,
        filter: &HistoryFilter,
    ) -> Result<Vec<NotificationEventRow>, sqlx::Error> {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {COLUMNS} FROM notification_events WHERE 1 = 1"));

        if let Some(resource_id) = &filter.resource_id {
            builder.push(" AND resource_id = ").push_bind(resource_id.clone());
        }
        if let Some(resource_type) = &filter.resource_type {
            builder.push(" AND resource_type = ").push_bind(resource_type.clone());
        }
        if let Some(metric_name) = &filter.metric_name {
            builder.push(" AND metric_name = ").push_bind(metric_name.clone());
        }
        if let Some(kind) = filter.kind {
            builder.push(" AND kind = ").push_bind(kind.as_str());
        }
        if let Some(since) = filter.since {
            builder
                .push(" AND julianday(occurred_at) >= julianday(")
                .push_bind(since)
                .push(")");
        }

        builder.push(" ORDER BY id DESC");
        if let Some(limit) = filter.limit {
            builder.push(" LIMIT ").push_bind(limit as i64);
        }

        builder
            .build_query_as::<NotificationEventRow>()
            .fetch_all(executor)
            .await
    }

    /// Truncate the history.
    pub async fn delete_all(executor: impl SqliteExecutor<'_>) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM notification_events")
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
