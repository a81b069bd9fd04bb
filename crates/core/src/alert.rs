//! Alert state and notification event types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::target::TargetKey;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

/// Health classification of a metric value. Ordered `Normal < Warning < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Normal,
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Normal => "normal",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }

    pub fn is_normal(self) -> bool {
        self == Severity::Normal
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(Severity::Normal),
            "warning" => Ok(Severity::Warning),
            "critical" => Ok(Severity::Critical),
            other => Err(CoreError::Validation(format!("unknown severity '{other}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// EventKind
// ---------------------------------------------------------------------------

/// Why a notification event was emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// Severity left Normal, or changed between Warning and Critical.
    Triggered,
    /// The same non-normal severity persisted past the reminder interval.
    Reminder,
    /// Severity returned to Normal.
    Recovered,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Triggered => "triggered",
            EventKind::Reminder => "reminder",
            EventKind::Recovered => "recovered",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "triggered" => Ok(EventKind::Triggered),
            "reminder" => Ok(EventKind::Reminder),
            "recovered" => Ok(EventKind::Recovered),
            other => Err(CoreError::Validation(format!("unknown event kind '{other}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// AlertRecord
// ---------------------------------------------------------------------------

/// Persistent alert state for one (resource, metric) pair.
///
/// Invariant: `current_severity == Normal` implies `first_triggered_at` is
/// `None`. Only [`crate::state_machine::transition`] produces new records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub key: TargetKey,
    pub current_severity: Severity,
    /// When severity last moved away from Normal.
    pub first_triggered_at: Option<Timestamp>,
    pub last_notified_at: Option<Timestamp>,
    pub last_value: Option<f64>,
    pub updated_at: Option<Timestamp>,
}

impl AlertRecord {
    /// A fresh record in the Normal state with no history.
    pub fn normal(key: TargetKey) -> Self {
        Self {
            key,
            current_severity: Severity::Normal,
            first_triggered_at: None,
            last_notified_at: None,
            last_value: None,
            updated_at: None,
        }
    }

    pub fn is_alerting(&self) -> bool {
        !self.current_severity.is_normal()
    }
}

// ---------------------------------------------------------------------------
// NotificationEvent
// ---------------------------------------------------------------------------

/// An immutable fact: a notification was decided for a target.
///
/// History records intent, not delivery: an event is appended whether or
/// not any channel manages to deliver it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub resource_ref: TargetKey,
    pub metric_name: String,
    /// Informational; not part of the key.
    #[serde(default)]
    pub region_or_scope: String,
    pub kind: EventKind,
    pub severity: Severity,
    pub value: f64,
    /// Threshold level associated with `severity` (the warning level for
    /// recoveries).
    pub threshold: f64,
    pub timestamp: Timestamp,
}

impl NotificationEvent {
    /// Short one-line summary, e.g. for subjects and log lines.
    pub fn summary(&self) -> String {
        format!(
            "[{}] {} {} {} (value {}, threshold {})",
            self.severity.as_str().to_uppercase(),
            self.kind,
            self.resource_ref.resource_id,
            self.metric_name,
            self.value,
            self.threshold,
        )
    }
}
