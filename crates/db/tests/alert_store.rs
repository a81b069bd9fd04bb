//! Integration tests for the SQLite alert store.
//!
//! Each test opens a fresh database file in a temporary directory so that
//! restart behaviour can be exercised by closing and reopening the pool.

use assert_matches::assert_matches;
use chrono::{DateTime, Duration, TimeZone, Utc};
use tempfile::TempDir;
use vigil_core::{AlertRecord, EventKind, NotificationEvent, Severity, TargetKey};
use vigil_db::{AlertStore, HistoryFilter, SqliteAlertStore, StoreError};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn t(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap() + Duration::minutes(minutes)
}

fn db_url(dir: &TempDir) -> String {
    format!("sqlite://{}", dir.path().join("alerts.db").display())
}

fn key(resource_id: &str) -> TargetKey {
    TargetKey::new(resource_id, "compute_instance", "cpu_utilization")
}

fn alerting(resource_id: &str, severity: Severity, at: i64) -> AlertRecord {
    AlertRecord {
        key: key(resource_id),
        current_severity: severity,
        first_triggered_at: Some(t(at)),
        last_notified_at: Some(t(at)),
        last_value: Some(93.5),
        updated_at: Some(t(at)),
    }
}

fn event(resource_id: &str, kind: EventKind, at: i64) -> NotificationEvent {
    NotificationEvent {
        resource_ref: key(resource_id),
        metric_name: "cpu_utilization".into(),
        region_or_scope: "us-east-1".into(),
        kind,
        severity: Severity::Critical,
        value: 93.5,
        threshold: 90.0,
        timestamp: t(at),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_target_reads_as_normal() {
    let dir = TempDir::new().unwrap();
    let store = SqliteAlertStore::connect(&db_url(&dir)).await.unwrap();

    let record = store.get_current_state(&key("i-none")).await.unwrap();
    assert_eq!(record, AlertRecord::normal(key("i-none")));
}

#[tokio::test]
async fn state_and_history_survive_restart() {
    let dir = TempDir::new().unwrap();
    let url = db_url(&dir);

    let before = {
        let store = SqliteAlertStore::connect(&url).await.unwrap();
        store
            .record_transition(
                &alerting("i-1", Severity::Critical, 0),
                Some(&event("i-1", EventKind::Triggered, 0)),
            )
            .await
            .unwrap();
        store
            .record_transition(
                &alerting("i-2", Severity::Warning, 5),
                Some(&event("i-2", EventKind::Triggered, 5)),
            )
            .await
            .unwrap();
        store.append(&event("i-1", EventKind::Reminder, 360)).await.unwrap();

        let mut normal = AlertRecord::normal(key("i-3"));
        normal.last_value = Some(12.0);
        normal.updated_at = Some(t(7));
        store.put_current_state(&normal).await.unwrap();

        let records = store.list_current_states().await.unwrap();
        store.pool().close().await;
        records
    };

    let reopened = SqliteAlertStore::connect(&url).await.unwrap();
    let after = reopened.list_current_states().await.unwrap();
    assert_eq!(before, after);
    assert_eq!(after.len(), 3);

    let history = reopened.list_history(&HistoryFilter::default()).await.unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].kind, EventKind::Reminder);
    assert_eq!(history[2], event("i-1", EventKind::Triggered, 0));
}

#[tokio::test]
async fn put_current_state_overwrites() {
    let dir = TempDir::new().unwrap();
    let store = SqliteAlertStore::connect(&db_url(&dir)).await.unwrap();

    store.put_current_state(&alerting("i-1", Severity::Warning, 0)).await.unwrap();
    store.put_current_state(&alerting("i-1", Severity::Critical, 3)).await.unwrap();

    let record = store.get_current_state(&key("i-1")).await.unwrap();
    assert_eq!(record.current_severity, Severity::Critical);
    assert_eq!(record.first_triggered_at, Some(t(3)));
    assert_eq!(store.list_current_states().await.unwrap().len(), 1);
}

#[tokio::test]
async fn history_filters() {
    let dir = TempDir::new().unwrap();
    let store = SqliteAlertStore::connect(&db_url(&dir)).await.unwrap();

    store.append(&event("i-1", EventKind::Triggered, 0)).await.unwrap();
    store.append(&event("i-2", EventKind::Triggered, 10)).await.unwrap();
    store.append(&event("i-1", EventKind::Reminder, 20)).await.unwrap();
    store.append(&event("i-1", EventKind::Recovered, 30)).await.unwrap();

    let for_i1 = store
        .list_history(&HistoryFilter::for_target(&key("i-1")))
        .await
        .unwrap();
    assert_eq!(for_i1.len(), 3);
    assert!(for_i1.iter().all(|e| e.resource_ref.resource_id == "i-1"));

    let triggered = store
        .list_history(&HistoryFilter::default().with_kind(EventKind::Triggered))
        .await
        .unwrap();
    assert_eq!(triggered.len(), 2);

    let recent = store
        .list_history(&HistoryFilter::default().since(t(15)))
        .await
        .unwrap();
    assert_eq!(recent.len(), 2);

    let latest = store
        .list_history(&HistoryFilter::default().with_limit(1))
        .await
        .unwrap();
    assert_eq!(latest.len(), 1);
    assert_eq!(latest[0].kind, EventKind::Recovered);
}

#[tokio::test]
async fn remove_current_state_keeps_history() {
    let dir = TempDir::new().unwrap();
    let store = SqliteAlertStore::connect(&db_url(&dir)).await.unwrap();

    store
        .record_transition(
            &alerting("i-1", Severity::Critical, 0),
            Some(&event("i-1", EventKind::Triggered, 0)),
        )
        .await
        .unwrap();
    store.remove_current_state(&key("i-1")).await.unwrap();

    assert!(store.list_current_states().await.unwrap().is_empty());
    assert_eq!(store.list_history(&HistoryFilter::default()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn clear_all_truncates_both_tables() {
    let dir = TempDir::new().unwrap();
    let store = SqliteAlertStore::connect(&db_url(&dir)).await.unwrap();

    store
        .record_transition(
            &alerting("i-1", Severity::Critical, 0),
            Some(&event("i-1", EventKind::Triggered, 0)),
        )
        .await
        .unwrap();
    store.clear_all().await.unwrap();

    assert!(store.list_current_states().await.unwrap().is_empty());
    assert!(store.list_history(&HistoryFilter::default()).await.unwrap().is_empty());
    let record = store.get_current_state(&key("i-1")).await.unwrap();
    assert_eq!(record.current_severity, Severity::Normal);
}

#[tokio::test]
async fn normal_record_with_trigger_time_is_rejected_by_schema() {
    let dir = TempDir::new().unwrap();
    let store = SqliteAlertStore::connect(&db_url(&dir)).await.unwrap();

    let mut broken = AlertRecord::normal(key("i-1"));
    broken.first_triggered_at = Some(t(0));

    let result = store.put_current_state(&broken).await;
    assert_matches!(result, Err(StoreError::Database(_)));
}

#[tokio::test]
async fn in_memory_url_shares_one_database() {
    let store = SqliteAlertStore::connect("sqlite::memory:").await.unwrap();
    store.put_current_state(&alerting("i-1", Severity::Warning, 0)).await.unwrap();
    assert_eq!(store.list_current_states().await.unwrap().len(), 1);
    vigil_db::health_check(store.pool()).await.unwrap();
}
