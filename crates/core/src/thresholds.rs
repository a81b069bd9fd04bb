//! Threshold evaluation engine.
//!
//! Pure logic: the caller resolves which [`Thresholds`] apply to a target and
//! passes them in together with the sampled value.

use serde::{Deserialize, Serialize};

use crate::alert::Severity;
use crate::error::CoreError;

/// Which side of the thresholds is unhealthy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Larger values are worse (CPU utilization, error rate).
    HighIsBad,
    /// Smaller values are worse (free storage, healthy node count).
    LowIsBad,
}

/// A warning/critical threshold pair for one metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub warning: f64,
    pub critical: f64,
    pub direction: Direction,
}

impl Thresholds {
    pub fn high_is_bad(warning: f64, critical: f64) -> Self {
        Self {
            warning,
            critical,
            direction: Direction::HighIsBad,
        }
    }

    pub fn low_is_bad(warning: f64, critical: f64) -> Self {
        Self {
            warning,
            critical,
            direction: Direction::LowIsBad,
        }
    }

    /// Reject non-finite levels and a critical level that sits on the
    /// healthy side of the warning level.
    pub fn validate(&self, metric_name: &str) -> Result<(), CoreError> {
        if !self.warning.is_finite() || !self.critical.is_finite() {
            return Err(CoreError::Validation(format!(
                "thresholds for {metric_name} must be finite, got warning={} critical={}",
                self.warning, self.critical
            )));
        }
        let ordered = match self.direction {
            Direction::HighIsBad => self.warning <= self.critical,
            Direction::LowIsBad => self.warning >= self.critical,
        };
        if !ordered {
            return Err(CoreError::Validation(format!(
                "thresholds for {metric_name} are inverted for {:?}: warning={} critical={}",
                self.direction, self.warning, self.critical
            )));
        }
        Ok(())
    }

    /// The level associated with a severity, as reported in events.
    ///
    /// Normal maps to the warning level: that is the boundary crossed on
    /// recovery.
    pub fn level_for(&self, severity: Severity) -> f64 {
        match severity {
            Severity::Critical => self.critical,
            Severity::Warning | Severity::Normal => self.warning,
        }
    }

    fn breaches(&self, value: f64, level: f64) -> bool {
        match self.direction {
            Direction::HighIsBad => value >= level,
            Direction::LowIsBad => value <= level,
        }
    }
}

/// Classify a sampled value against its thresholds.
///
/// Missing thresholds are a configuration defect and are reported as
/// [`CoreError::Validation`] rather than defaulted.
pub fn evaluate(
    metric_name: &str,
    value: f64,
    thresholds: Option<&Thresholds>,
) -> Result<Severity, CoreError> {
    let thresholds = thresholds.ok_or_else(|| {
        CoreError::Validation(format!("no thresholds configured for metric {metric_name}"))
    })?;
    thresholds.validate(metric_name)?;

    if !value.is_finite() {
        return Err(CoreError::Validation(format!(
            "sample for {metric_name} is not a finite number: {value}"
        )));
    }

    let severity = if thresholds.breaches(value, thresholds.critical) {
        Severity::Critical
    } else if thresholds.breaches(value, thresholds.warning) {
        Severity::Warning
    } else {
        Severity::Normal
    };
    Ok(severity)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const CPU: &str = "cpu_utilization";
    const STORAGE: &str = "free_storage_gb";

    fn cpu() -> Thresholds {
        Thresholds::high_is_bad(80.0, 90.0)
    }

    fn storage() -> Thresholds {
        Thresholds::low_is_bad(20.0, 5.0)
    }

    #[test]
    fn high_is_bad_levels() {
        assert_eq!(evaluate(CPU, 50.0, Some(&cpu())).unwrap(), Severity::Normal);
        assert_eq!(evaluate(CPU, 85.0, Some(&cpu())).unwrap(), Severity::Warning);
        assert_eq!(evaluate(CPU, 95.0, Some(&cpu())).unwrap(), Severity::Critical);
    }

    #[test]
    fn high_is_bad_boundaries_are_inclusive() {
        assert_eq!(evaluate(CPU, 80.0, Some(&cpu())).unwrap(), Severity::Warning);
        assert_eq!(evaluate(CPU, 90.0, Some(&cpu())).unwrap(), Severity::Critical);
        assert_eq!(evaluate(CPU, 79.99, Some(&cpu())).unwrap(), Severity::Normal);
    }

    #[test]
    fn low_is_bad_levels() {
        assert_eq!(evaluate(STORAGE, 100.0, Some(&storage())).unwrap(), Severity::Normal);
        assert_eq!(evaluate(STORAGE, 20.0, Some(&storage())).unwrap(), Severity::Warning);
        assert_eq!(evaluate(STORAGE, 12.0, Some(&storage())).unwrap(), Severity::Warning);
        assert_eq!(evaluate(STORAGE, 5.0, Some(&storage())).unwrap(), Severity::Critical);
        assert_eq!(evaluate(STORAGE, 0.0, Some(&storage())).unwrap(), Severity::Critical);
    }

    #[test]
    fn missing_thresholds_is_a_validation_error() {
        let err = evaluate(CPU, 50.0, None).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(err.to_string().contains(CPU));
    }

    #[test]
    fn inverted_thresholds_are_rejected() {
        let inverted = Thresholds::high_is_bad(90.0, 80.0);
        assert!(evaluate(CPU, 50.0, Some(&inverted)).is_err());

        let inverted_low = Thresholds::low_is_bad(5.0, 20.0);
        assert!(inverted_low.validate(STORAGE).is_err());
    }

    #[test]
    fn equal_levels_are_allowed() {
        let flat = Thresholds::high_is_bad(90.0, 90.0);
        assert_eq!(evaluate(CPU, 90.0, Some(&flat)).unwrap(), Severity::Critical);
    }

    #[test]
    fn non_finite_values_are_rejected() {
        assert!(evaluate(CPU, f64::NAN, Some(&cpu())).is_err());
        assert!(evaluate(CPU, f64::INFINITY, Some(&cpu())).is_err());
        let nan_level = Thresholds::high_is_bad(f64::NAN, 90.0);
        assert!(nan_level.validate(CPU).is_err());
    }

    #[test]
    fn level_for_severity() {
        assert_eq!(cpu().level_for(Severity::Critical), 90.0);
        assert_eq!(cpu().level_for(Severity::Warning), 80.0);
        assert_eq!(cpu().level_for(Severity::Normal), 80.0);
    }

    #[test]
    fn direction_serializes_snake_case() {
        let json = serde_json::to_value(storage()).unwrap();
        assert_eq!(json["direction"], "low_is_bad");
    }
}
