//! Vigil polling engine.
//!
//! The [`Scheduler`] owns the registry of watched targets and the per-target
//! alert state table. On every tick it samples each target through a
//! [`MetricSource`], classifies the value, applies the alert state machine,
//! persists the result through an [`AlertStore`](vigil_db::AlertStore) and
//! queues any notification on the notifier.

pub mod config;
pub mod error;
pub mod http_source;
pub mod registry;
pub mod scheduler;
pub mod source;
pub mod state_table;

pub use config::MonitorConfig;
pub use error::MonitorError;
pub use http_source::HttpMetricSource;
pub use registry::TargetRegistry;
pub use scheduler::{MonitorStatus, Scheduler, TickReport};
pub use source::{MetricSource, SourceError};
pub use state_table::AlertStateTable;
