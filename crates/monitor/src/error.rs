use vigil_core::CoreError;
use vigil_db::StoreError;

/// Error type for registration and administrative operations.
///
/// Per-target failures inside a tick are logged and counted in the
/// [`TickReport`](crate::TickReport) instead.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Alert store error: {0}")]
    Store(#[from] StoreError),
}
