//! Rows for `alert_records` and `notification_events`.

use sqlx::FromRow;
use vigil_core::types::Timestamp;
use vigil_core::{AlertRecord, CoreError, NotificationEvent, TargetKey};

// ---------------------------------------------------------------------------
// Current state
// ---------------------------------------------------------------------------

/// One row of the current-state table.
#[derive(Debug, Clone, FromRow)]
pub struct AlertRecordRow {
    pub resource_id: String,
    pub resource_type: String,
    pub metric_name: String,
    pub current_severity: String,
    pub first_triggered_at: Option<Timestamp>,
    pub last_notified_at: Option<Timestamp>,
    pub last_value: Option<f64>,
    pub updated_at: Option<Timestamp>,
}

impl TryFrom<AlertRecordRow> for AlertRecord {
    type Error = CoreError;

    fn try_from(row: AlertRecordRow) -> Result<Self, Self::Error> {
        Ok(AlertRecord {
            key: TargetKey::new(row.resource_id, row.resource_type, row.metric_name),
            current_severity: row.current_severity.parse()?,
            first_triggered_at: row.first_triggered_at,
            last_notified_at: row.last_notified_at,
            last_value: row.last_value,
            updated_at: row.updated_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Event history (append-only)
// ---------------------------------------------------------------------------

/// One row of the notification history.
#[derive(Debug, Clone, FromRow)]
pub struct NotificationEventRow {
    pub id: i64,
    pub resource_id: String,
    pub resource_type: String,
    pub metric_name: String,
    pub region_or_scope: String,
    pub kind: String,
    pub severity: String,
    pub value: f64,
    pub threshold: f64,
    pub occurred_at: Timestamp,
}

impl TryFrom<NotificationEventRow> for NotificationEvent {
    type Error = CoreError;

    fn try_from(row: NotificationEventRow) -> Result<Self, Self::Error> {
        Ok(NotificationEvent {
            metric_name: row.metric_name.clone(),
            resource_ref: TargetKey::new(row.resource_id, row.resource_type, row.metric_name),
            region_or_scope: row.region_or_scope,
            kind: row.kind.parse()?,
            severity: row.severity.parse()?,
            value: row.value,
            threshold: row.threshold,
            timestamp: row.occurred_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_core::{EventKind, Severity};

    fn record_row(severity: &str) -> AlertRecordRow {
        AlertRecordRow {
            resource_id: "db-1".into(),
            resource_type: "managed_database".into(),
            metric_name: "free_storage_gb".into(),
            current_severity: severity.into(),
            first_triggered_at: None,
            last_notified_at: None,
            last_value: Some(3.0),
            updated_at: None,
        }
    }

    #[test]
    fn record_row_converts() {
        let record = AlertRecord::try_from(record_row("critical")).unwrap();
        assert_eq!(record.current_severity, Severity::Critical);
        assert_eq!(record.key.metric_name, "free_storage_gb");
    }

    #[test]
    fn unknown_severity_is_rejected() {
        assert!(AlertRecord::try_from(record_row("sev1")).is_err());
    }

    #[test]
    fn event_row_converts() {
        let row = NotificationEventRow {
            id: 1,
            resource_id: "db-1".into(),
            resource_type: "managed_database".into(),
            metric_name: "free_storage_gb".into(),
            region_or_scope: "eu-west-1".into(),
            kind: "reminder".into(),
            severity: "warning".into(),
            value: 12.0,
            threshold: 20.0,
            occurred_at: chrono::Utc::now(),
        };
        let event = NotificationEvent::try_from(row).unwrap();
        assert_eq!(event.kind, EventKind::Reminder);
        assert_eq!(event.resource_ref.metric_name, event.metric_name);
    }
}
