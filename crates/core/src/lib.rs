//! Vigil core domain logic.
//!
//! Everything in this crate is pure: no database, no network, no async
//! runtime. The `db`, `events` and `monitor` crates build on these types.
//!
//! - [`thresholds`]: the threshold evaluator mapping a sample to a [`Severity`].
//! - [`state_machine`]: per-target hysteresis producing notification events.
//! - [`alert`]: alert records and the immutable notification event.
//! - [`target`]: watched targets, their stable keys and samples.

pub mod alert;
pub mod error;
pub mod state_machine;
pub mod target;
pub mod thresholds;
pub mod types;

pub use alert::{AlertRecord, EventKind, NotificationEvent, Severity};
pub use error::CoreError;
pub use target::{Sample, TargetKey, WatchedTarget};
pub use thresholds::{Direction, Thresholds};
