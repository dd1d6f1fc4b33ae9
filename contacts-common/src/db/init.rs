//! Database initialization
//!
//! Opens (or creates) the record store and applies the schema. Every pooled
//! connection enables foreign keys so history rows cascade with their contact.

use crate::{Error, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Per-connection lock wait before SQLite reports SQLITE_BUSY
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Parse a SQLite connection string into connect options
///
/// Accepts `sqlite://path`, `sqlite:path` and `sqlite::memory:`. The database
/// file is created if missing, foreign keys are enforced and WAL journaling is
/// enabled so several processes can share the file.
pub fn sqlite_options(url: &str) -> Result<SqliteConnectOptions> {
    if !url.starts_with("sqlite:") {
        return Err(Error::Config(format!(
            "Unsupported database URL '{}' (expected sqlite://)",
            url
        )));
    }
    let options = SqliteConnectOptions::from_str(url)
        .map_err(|e| Error::Config(format!("Invalid database URL '{}': {}", url, e)))?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT);
    Ok(options)
}

/// Initialize database connection and create tables if needed
pub async fn init_database(url: &str) -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(sqlite_options(url)?)
        .await?;

    info!("Opened record store: {}", url);

    // Idempotent, safe on every startup
    create_contacts_table(&pool).await?;
    create_history_table(&pool).await?;

    Ok(pool)
}

pub async fn create_contacts_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS contacts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            phone TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn create_history_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            contact_id INTEGER NOT NULL REFERENCES contacts(id) ON DELETE CASCADE,
            created_at TIMESTAMP NOT NULL,
            data TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_history_contact ON history(contact_id, created_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
