use std::collections::HashMap;
use std::time::Duration;

use vigil_core::Thresholds;

/// Default poll cadence: 15 minutes.
const DEFAULT_POLL_INTERVAL_SECS: u64 = 15 * 60;
/// Shortest poll cadence the scheduler will run at.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);
/// Default reminder cadence for sustained alerts: 6 hours.
const DEFAULT_REMINDER_INTERVAL_SECS: u64 = 6 * 60 * 60;
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;
/// Default look-back window handed to metric sources: 5 minutes.
const DEFAULT_METRIC_WINDOW_SECS: u64 = 5 * 60;
const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 16;
const DEFAULT_NOTIFY_QUEUE_CAPACITY: usize = 256;
const DEFAULT_DELIVERY_TIMEOUT_SECS: u64 = 20;

/// Engine configuration.
///
/// Cadences are configuration, not invariants: the contract is "dedupe
/// immediately, remind periodically, announce recovery", whatever the
/// numbers.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub poll_interval: Duration,
    pub reminder_interval: Duration,
    /// Upper bound on a single metric source call.
    pub fetch_timeout: Duration,
    pub metric_window: Duration,
    pub max_concurrent_fetches: usize,
    pub notify_queue_capacity: usize,
    /// Upper bound on a single channel delivery.
    pub delivery_timeout: Duration,
    /// Thresholds per metric name, used when a target has no override.
    pub default_thresholds: HashMap<String, Thresholds>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            reminder_interval: Duration::from_secs(DEFAULT_REMINDER_INTERVAL_SECS),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            metric_window: Duration::from_secs(DEFAULT_METRIC_WINDOW_SECS),
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
            notify_queue_capacity: DEFAULT_NOTIFY_QUEUE_CAPACITY,
            delivery_timeout: Duration::from_secs(DEFAULT_DELIVERY_TIMEOUT_SECS),
            default_thresholds: HashMap::new(),
        }
    }
}

impl MonitorConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                        | Default  |
    /// |--------------------------------|----------|
    /// | `VIGIL_POLL_INTERVAL_SECS`     | `900`    |
    /// | `VIGIL_REMINDER_INTERVAL_SECS` | `21600`  |
    /// | `VIGIL_FETCH_TIMEOUT_SECS`     | `30`     |
    /// | `VIGIL_METRIC_WINDOW_SECS`     | `300`    |
    /// | `VIGIL_MAX_CONCURRENT_FETCHES` | `16`     |
    /// | `VIGIL_NOTIFY_QUEUE_CAPACITY`  | `256`    |
    /// | `VIGIL_DELIVERY_TIMEOUT_SECS`  | `20`     |
    ///
    /// A poll interval below one second is raised to [`MIN_POLL_INTERVAL`].
    /// Default thresholds are not read from the environment; attach them
    /// with [`with_default_thresholds`](Self::with_default_thresholds).
    pub fn from_env() -> Self {
        Self {
            poll_interval: env_secs("VIGIL_POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS)
                .max(MIN_POLL_INTERVAL),
            reminder_interval: env_secs(
                "VIGIL_REMINDER_INTERVAL_SECS",
                DEFAULT_REMINDER_INTERVAL_SECS,
            ),
            fetch_timeout: env_secs("VIGIL_FETCH_TIMEOUT_SECS", DEFAULT_FETCH_TIMEOUT_SECS),
            metric_window: env_secs("VIGIL_METRIC_WINDOW_SECS", DEFAULT_METRIC_WINDOW_SECS),
            max_concurrent_fetches: env_parse(
                "VIGIL_MAX_CONCURRENT_FETCHES",
                DEFAULT_MAX_CONCURRENT_FETCHES,
            )
            .max(1),
            notify_queue_capacity: env_parse(
                "VIGIL_NOTIFY_QUEUE_CAPACITY",
                DEFAULT_NOTIFY_QUEUE_CAPACITY,
            )
            .max(1),
            delivery_timeout: env_secs(
                "VIGIL_DELIVERY_TIMEOUT_SECS",
                DEFAULT_DELIVERY_TIMEOUT_SECS,
            ),
            default_thresholds: HashMap::new(),
        }
    }

    /// Register the default thresholds for a metric name.
    pub fn with_default_thresholds(
        mut self,
        metric_name: impl Into<String>,
        thresholds: Thresholds,
    ) -> Self {
        self.default_thresholds.insert(metric_name.into(), thresholds);
        self
    }

    /// The poll cadence actually used, never shorter than
    /// [`MIN_POLL_INTERVAL`].
    pub fn effective_poll_interval(&self) -> Duration {
        self.poll_interval.max(MIN_POLL_INTERVAL)
    }

    pub fn reminder_interval_chrono(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.reminder_interval).unwrap_or(chrono::Duration::MAX)
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(var = name, value = %raw, "Invalid value, using default");
            default
        }),
        Err(_) => default,
    }
}

fn env_secs(name: &str, default_secs: u64) -> Duration {
    Duration::from_secs(env_parse(name, default_secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_cadence() {
        let config = MonitorConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(900));
        assert_eq!(config.reminder_interval, Duration::from_secs(21600));
        assert!(config.default_thresholds.is_empty());
    }

    #[test]
    fn env_overrides_and_bad_values_fall_back() {
        std::env::set_var("VIGIL_TEST_ONLY_SECS", "42");
        assert_eq!(env_secs("VIGIL_TEST_ONLY_SECS", 1), Duration::from_secs(42));
        std::env::set_var("VIGIL_TEST_ONLY_SECS", "soon");
        assert_eq!(env_secs("VIGIL_TEST_ONLY_SECS", 7), Duration::from_secs(7));
        std::env::remove_var("VIGIL_TEST_ONLY_SECS");
        assert_eq!(env_secs("VIGIL_TEST_ONLY_SECS", 3), Duration::from_secs(3));
    }

    #[test]
    fn zero_poll_interval_is_clamped() {
        std::env::set_var("VIGIL_POLL_INTERVAL_SECS", "0");
        let config = MonitorConfig::from_env();
        std::env::remove_var("VIGIL_POLL_INTERVAL_SECS");
        assert_eq!(config.poll_interval, MIN_POLL_INTERVAL);

        let config = MonitorConfig {
            poll_interval: Duration::ZERO,
            ..MonitorConfig::default()
        };
        assert_eq!(config.effective_poll_interval(), MIN_POLL_INTERVAL);
    }

    #[test]
    fn default_thresholds_are_keyed_by_metric() {
        let config = MonitorConfig::default()
            .with_default_thresholds("cpu_utilization", Thresholds::high_is_bad(80.0, 90.0));
        assert!(config.default_thresholds.contains_key("cpu_utilization"));
    }
}
