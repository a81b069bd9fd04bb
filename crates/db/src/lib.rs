//! Vigil alert persistence.
//!
//! - [`AlertStore`]: the durable current-state table plus append-only event
//!   history the scheduler writes through.
//! - [`SqliteAlertStore`]: the production store, backed by `sqlx` with
//!   embedded migrations.
//! - [`MemoryAlertStore`]: a non-durable store for tests and dry runs.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

pub mod models;
pub mod repositories;
pub mod store;

pub use store::memory::MemoryAlertStore;
pub use store::sqlite::SqliteAlertStore;
pub use store::{AlertStore, HistoryFilter, StoreError};

pub type DbPool = sqlx::SqlitePool;

/// Maximum pool size for file-backed databases.
const MAX_CONNECTIONS: u32 = 5;

/// Create a connection pool from a database URL, creating the file if needed.
///
/// In-memory URLs get a single long-lived connection: every SQLite
/// connection to `:memory:` opens its own private database.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    let in_memory = database_url.contains(":memory:");
    let mut options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    if !in_memory {
        options = options.journal_mode(SqliteJournalMode::Wal);
    }

    let mut pool_options = SqlitePoolOptions::new();
    pool_options = if in_memory {
        pool_options
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        pool_options.max_connections(MAX_CONNECTIONS)
    };

    pool_options.connect_with(options).await
}

/// Verify the database answers a trivial query.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply the embedded migrations under `crates/db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
