//! Query functions for the alert tables.
//!
//! Every function takes a generic SQLite executor so it can run either on
//! the pool or inside a transaction.

pub mod alert_record_repo;
pub mod notification_event_repo;

pub use alert_record_repo::AlertRecordRepo;
pub use notification_event_repo::NotificationEventRepo;
