//! Per-target alert hysteresis.
//!
//! [`transition`] is the only place a new [`AlertRecord`] is computed. Every
//! notification the engine sends comes from exactly one of its five rules:
//!
//! | Previous            | New                 | Event                          |
//! |---------------------|---------------------|--------------------------------|
//! | Normal              | Warning / Critical  | `Triggered`                    |
//! | Warning / Critical  | the other one       | `Triggered`                    |
//! | Warning / Critical  | same                | `Reminder` once interval passed |
//! | Warning / Critical  | Normal              | `Recovered`                    |
//! | Normal              | Normal              | none                           |
//!
//! The function is pure; persisting the record before dispatching the event
//! is the caller's job.

use chrono::Duration;

use crate::alert::{AlertRecord, EventKind, NotificationEvent, Severity};
use crate::thresholds::Thresholds;
use crate::types::Timestamp;

/// A classified sample ready to be applied to a record.
#[derive(Debug, Clone, Copy)]
pub struct Observation<'a> {
    pub severity: Severity,
    pub value: f64,
    pub thresholds: &'a Thresholds,
    pub region_or_scope: &'a str,
    pub now: Timestamp,
}

/// The outcome of applying one observation.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub record: AlertRecord,
    pub event: Option<NotificationEvent>,
}

/// Whether a sustained condition is due for a reminder at `now`.
///
/// A non-normal record with no notification time on file is treated as due.
pub fn reminder_due(record: &AlertRecord, now: Timestamp, reminder_interval: Duration) -> bool {
    match record.last_notified_at {
        Some(last) => now.signed_duration_since(last) >= reminder_interval,
        None => true,
    }
}

/// Apply an observation to a record.
pub fn transition(
    record: &AlertRecord,
    obs: Observation<'_>,
    reminder_interval: Duration,
) -> Transition {
    let mut next = record.clone();
    next.last_value = Some(obs.value);
    next.updated_at = Some(obs.now);

    let previous = record.current_severity;
    let kind = match (previous, obs.severity) {
        (Severity::Normal, Severity::Normal) => None,
        (Severity::Normal, _) => {
            next.first_triggered_at = Some(obs.now);
            next.last_notified_at = Some(obs.now);
            Some(EventKind::Triggered)
        }
        (_, Severity::Normal) => {
            next.first_triggered_at = None;
            next.last_notified_at = Some(obs.now);
            Some(EventKind::Recovered)
        }
        (prev, new) if prev != new => {
            next.first_triggered_at.get_or_insert(obs.now);
            next.last_notified_at = Some(obs.now);
            Some(EventKind::Triggered)
        }
        _ => {
            if reminder_due(record, obs.now, reminder_interval) {
                next.first_triggered_at.get_or_insert(obs.now);
                next.last_notified_at = Some(obs.now);
                Some(EventKind::Reminder)
            } else {
                None
            }
        }
    };
    next.current_severity = obs.severity;

    let event = kind.map(|kind| NotificationEvent {
        resource_ref: record.key.clone(),
        metric_name: record.key.metric_name.clone(),
        region_or_scope: obs.region_or_scope.to_string(),
        kind,
        severity: obs.severity,
        value: obs.value,
        threshold: obs.thresholds.level_for(obs.severity),
        timestamp: obs.now,
    });

    Transition {
        record: next,
        event,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    use super::*;
    use crate::target::TargetKey;
    use crate::thresholds::evaluate;

    fn key() -> TargetKey {
        TargetKey::new("i-0abc", "compute_instance", "cpu_utilization")
    }

    fn t(minutes: i64) -> Timestamp {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn apply(record: &AlertRecord, severity: Severity, value: f64, minutes: i64) -> Transition {
        let thresholds = Thresholds::high_is_bad(80.0, 90.0);
        transition(
            record,
            Observation {
                severity,
                value,
                thresholds: &thresholds,
                region_or_scope: "us-east-1",
                now: t(minutes),
            },
            Duration::hours(6),
        )
    }

    #[test]
    fn normal_to_warning_triggers() {
        let out = apply(&AlertRecord::normal(key()), Severity::Warning, 85.0, 0);
        let event = out.event.expect("should emit");
        assert_eq!(event.kind, EventKind::Triggered);
        assert_eq!(event.severity, Severity::Warning);
        assert_eq!(event.threshold, 80.0);
        assert_eq!(out.record.first_triggered_at, Some(t(0)));
        assert_eq!(out.record.last_notified_at, Some(t(0)));
    }

    #[test]
    fn escalation_triggers_immediately_and_keeps_first_triggered() {
        let first = apply(&AlertRecord::normal(key()), Severity::Warning, 85.0, 0);
        let second = apply(&first.record, Severity::Critical, 95.0, 1);
        let event = second.event.expect("severity change must be reported");
        assert_eq!(event.kind, EventKind::Triggered);
        assert_eq!(event.threshold, 90.0);
        assert_eq!(second.record.first_triggered_at, Some(t(0)));
        assert_eq!(second.record.last_notified_at, Some(t(1)));
    }

    #[test]
    fn de_escalation_also_triggers() {
        let first = apply(&AlertRecord::normal(key()), Severity::Critical, 95.0, 0);
        let second = apply(&first.record, Severity::Warning, 85.0, 1);
        assert_eq!(second.event.unwrap().kind, EventKind::Triggered);
    }

    #[test]
    fn repeated_severity_is_suppressed_within_interval() {
        let first = apply(&AlertRecord::normal(key()), Severity::Warning, 85.0, 0);
        let second = apply(&first.record, Severity::Warning, 86.0, 15);
        assert!(second.event.is_none());
        assert_eq!(second.record.last_value, Some(86.0));
        assert_eq!(second.record.last_notified_at, Some(t(0)));
    }

    #[test]
    fn reminder_after_interval() {
        let first = apply(&AlertRecord::normal(key()), Severity::Critical, 95.0, 0);
        let later = apply(&first.record, Severity::Critical, 96.0, 6 * 60);
        let event = later.event.expect("reminder due");
        assert_eq!(event.kind, EventKind::Reminder);
        assert_eq!(later.record.last_notified_at, Some(t(6 * 60)));
        assert_eq!(later.record.first_triggered_at, Some(t(0)));
    }

    #[test]
    fn recovery_clears_first_triggered() {
        let first = apply(&AlertRecord::normal(key()), Severity::Critical, 95.0, 0);
        let recovered = apply(&first.record, Severity::Normal, 40.0, 5);
        let event = recovered.event.expect("recovery");
        assert_eq!(event.kind, EventKind::Recovered);
        assert_eq!(event.severity, Severity::Normal);
        assert_eq!(event.threshold, 80.0);
        assert_eq!(recovered.record.current_severity, Severity::Normal);
        assert!(recovered.record.first_triggered_at.is_none());
    }

    #[test]
    fn normal_stays_quiet() {
        let out = apply(&AlertRecord::normal(key()), Severity::Normal, 10.0, 0);
        assert!(out.event.is_none());
        assert_eq!(out.record.last_value, Some(10.0));
    }

    #[test]
    fn restored_alert_without_notification_time_is_due() {
        let mut record = AlertRecord::normal(key());
        record.current_severity = Severity::Warning;
        record.first_triggered_at = Some(t(0));
        let out = apply(&record, Severity::Warning, 85.0, 1);
        assert_eq!(out.event.unwrap().kind, EventKind::Reminder);
    }

    #[test]
    fn scenario_warning_critical_recovery() {
        let thresholds = Thresholds::high_is_bad(80.0, 90.0);
        let mut record = AlertRecord::normal(key());
        let mut kinds = Vec::new();
        for (i, value) in [85.0, 87.0, 95.0, 60.0].into_iter().enumerate() {
            let severity = evaluate("cpu_utilization", value, Some(&thresholds)).unwrap();
            let out = apply(&record, severity, value, i as i64 * 15);
            kinds.push(out.event.as_ref().map(|e| (e.kind, e.severity)));
            record = out.record;
        }
        assert_eq!(
            kinds,
            vec![
                Some((EventKind::Triggered, Severity::Warning)),
                None,
                Some((EventKind::Triggered, Severity::Critical)),
                Some((EventKind::Recovered, Severity::Normal)),
            ]
        );
    }

    fn severity_strategy() -> impl Strategy<Value = Severity> {
        prop_oneof![
            Just(Severity::Normal),
            Just(Severity::Warning),
            Just(Severity::Critical),
        ]
    }

    proptest! {
        /// The emitted kind is always the one the transition table dictates,
        /// and the record invariant holds after every step.
        #[test]
        fn emitted_kinds_follow_the_table(
            steps in prop::collection::vec((severity_strategy(), 0i64..240), 1..60),
            reminder_minutes in 1i64..600,
        ) {
            let thresholds = Thresholds::high_is_bad(80.0, 90.0);
            let interval = Duration::minutes(reminder_minutes);
            let mut record = AlertRecord::normal(key());
            let mut clock = 0i64;

            for (severity, advance) in steps {
                clock += advance;
                let now = t(clock);
                let previous = record.clone();
                let out = transition(
                    &record,
                    Observation {
                        severity,
                        value: 0.0,
                        thresholds: &thresholds,
                        region_or_scope: "",
                        now,
                    },
                    interval,
                );

                let expected = match (previous.current_severity, severity) {
                    (Severity::Normal, Severity::Normal) => None,
                    (Severity::Normal, _) => Some(EventKind::Triggered),
                    (_, Severity::Normal) => Some(EventKind::Recovered),
                    (p, n) if p != n => Some(EventKind::Triggered),
                    _ => {
                        let last = previous.last_notified_at.expect("alerting record was notified");
                        (now - last >= interval).then_some(EventKind::Reminder)
                    }
                };
                prop_assert_eq!(out.event.as_ref().map(|e| e.kind), expected);

                if out.record.current_severity == Severity::Normal {
                    prop_assert!(out.record.first_triggered_at.is_none());
                } else {
                    prop_assert!(out.record.first_triggered_at.is_some());
                }
                record = out.record;
            }
        }

        /// Feeding the same severity twice inside the reminder interval never
        /// emits on the second observation.
        #[test]
        fn same_severity_twice_is_idempotent(
            severity in severity_strategy(),
            gap in 0i64..59,
        ) {
            let first = apply(&AlertRecord::normal(key()), severity, 0.0, 0);
            let thresholds = Thresholds::high_is_bad(80.0, 90.0);
            let second = transition(
                &first.record,
                Observation {
                    severity,
                    value: 0.0,
                    thresholds: &thresholds,
                    region_or_scope: "",
                    now: t(gap),
                },
                Duration::hours(1),
            );
            prop_assert!(second.event.is_none());
        }
    }
}
