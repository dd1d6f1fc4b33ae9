//! History persistence
//!
//! History rows are append-only. The only way a row disappears is the
//! `ON DELETE CASCADE` on its owning contact.

use crate::db::models::{History, HistorySnapshot};
use crate::Result;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

/// Append a snapshot row for a contact
pub async fn insert_history(
    pool: &SqlitePool,
    contact_id: i64,
    snapshot: &HistorySnapshot,
) -> Result<History> {
    let data = serde_json::to_string(snapshot)?;
    let created_at = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO history (contact_id, created_at, data)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(contact_id)
    .bind(created_at)
    .bind(&data)
    .execute(pool)
    .await?;

    Ok(History {
        id: result.last_insert_rowid(),
        contact_id,
        snapshot: snapshot.clone(),
        created_at,
    })
}

/// History of a contact, newest first
///
/// An unknown contact simply has no history.
pub async fn list_history(pool: &SqlitePool, contact_id: i64) -> Result<Vec<History>> {
    let rows = sqlx::query(
        r#"
        SELECT id, contact_id, created_at, data
        FROM history
        WHERE contact_id = ?
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .bind(contact_id)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| -> Result<History> {
            let data: String = row.try_get("data")?;
            let created_at: DateTime<Utc> = row.try_get("created_at")?;
            Ok(History {
                id: row.try_get("id")?,
                contact_id: row.try_get("contact_id")?,
                snapshot: serde_json::from_str(&data)?,
                created_at,
            })
        })
        .collect()
}

/// Number of history rows for a contact
pub async fn count_history(pool: &SqlitePool, contact_id: i64) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM history WHERE contact_id = ?")
        .bind(contact_id)
        .fetch_one(pool)
        .await?;
    Ok(count)
}
