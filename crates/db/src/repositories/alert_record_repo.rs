//! Repository for the `alert_records` table.

use sqlx::SqliteExecutor;
use vigil_core::{AlertRecord, TargetKey};

use crate::models::alert::AlertRecordRow;

/// Column list for `alert_records` queries.
const COLUMNS: &str = "\
    resource_id, resource_type, metric_name, current_severity, \
    first_triggered_at, last_notified_at, last_value, updated_at";

/// Provides query operations for current alert state.
pub struct AlertRecordRepo;

impl AlertRecordRepo {
    /// Fetch the row for one target, if any.
    pub async fn find(
        executor: impl SqliteExecutor<'_>,
        key: &TargetKey,
    ) -> Result<Option<AlertRecordRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM alert_records \
             WHERE resource_id = ?1 AND resource_type = ?2 AND metric_name = ?3"
        );
        sqlx::query_as::<_, AlertRecordRow>(&query)
            .bind(&key.resource_id)
            .bind(&key.resource_type)
            .bind(&key.metric_name)
            .fetch_optional(executor)
            .await
    }

    /// List every stored record, ordered by key.
    pub async fn list_all(
        executor: impl SqliteExecutor<'_>,
    ) -> Result<Vec<AlertRecordRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM alert_records \
             ORDER BY resource_type, resource_id, metric_name"
        );
        sqlx::query_as::<_, AlertRecordRow>(&query)
            .fetch_all(executor)
            .await
    }

    /// Insert or replace the record for its key.
    pub async fn upsert(
        executor: impl SqliteExecutor<'_>,
        record: &AlertRecord,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO alert_records \
                (resource_id, resource_type, metric_name, current_severity, \
                 first_triggered_at, last_notified_at, last_value, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8) \
             ON CONFLICT (resource_id, resource_type, metric_name) \
             DO UPDATE SET \
                current_severity = excluded.current_severity, \
                first_triggered_at = excluded.first_triggered_at, \
                last_notified_at = excluded.last_notified_at, \
                last_value = excluded.last_value, \
                updated_at = excluded.updated_at",
        )
        .bind(&record.key.resource_id)
        .bind(&record.key.resource_type)
        .bind(&record.key.metric_name)
        .bind(record.current_severity.as_str())
        .bind(record.first_triggered_at)
        .bind(record.last_notified_at)
        .bind(record.last_value)
        .bind(record.updated_at)
        .execute(executor)
        .await?;
        Ok(())
    }

    /// Delete the record for one target. Returns the number of rows removed.
    pub async fn delete(
        executor: impl SqliteExecutor<'_>,
        key: &TargetKey,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM alert_records \
             WHERE resource_id = ?1 AND resource_type = ?2 AND metric_name = ?3",
        )
        .bind(&key.resource_id)
        .bind(&key.resource_type)
        .bind(&key.metric_name)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    /// Delete every record.
    pub async fn delete_all(executor: impl SqliteExecutor<'_>) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM alert_records")
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
