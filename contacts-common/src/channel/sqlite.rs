//! Cross-process change channel backed by a SQLite table
//!
//! Publishing appends a row to `change_signals` and trims older rows of the
//! same channel, so the table holds at most the latest signal per channel.
//! `seq` is AUTOINCREMENT and never reused, which lets a subscription detect
//! new signals by comparing the current maximum against the last one it saw.
//! Every process opening the same database file shares the channel.

use super::{ChangeChannel, ChangeSubscription};
use crate::db::init::sqlite_options;
use crate::Result;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

pub struct SqliteChannel {
    name: String,
    pool: SqlitePool,
}

impl SqliteChannel {
    /// Open the signal table in the database at `url`, creating it if needed
    pub async fn connect(url: &str, name: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(2)
            .connect_with(sqlite_options(url)?)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS change_signals (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                channel TEXT NOT NULL,
                published_at TIMESTAMP NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        info!("Change channel '{}' connected: {}", name, url);

        Ok(Self {
            name: name.to_string(),
            pool,
        })
    }
}

async fn latest_seq(pool: &SqlitePool, channel: &str) -> Result<i64> {
    let seq: i64 =
        sqlx::query_scalar("SELECT COALESCE(MAX(seq), 0) FROM change_signals WHERE channel = ?")
            .bind(channel)
            .fetch_one(pool)
            .await?;
    Ok(seq)
}

#[async_trait]
impl ChangeChannel for SqliteChannel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn publish(&self) -> Result<()> {
        let seq = sqlx::query("INSERT INTO change_signals (channel, published_at) VALUES (?, ?)")
            .bind(&self.name)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?
            .last_insert_rowid();

        sqlx::query("DELETE FROM change_signals WHERE channel = ? AND seq < ?")
            .bind(&self.name)
            .bind(seq)
            .execute(&self.pool)
            .await?;

        debug!("Published change signal {} on '{}'", seq, self.name);
        Ok(())
    }

    async fn subscribe(&self) -> Result<Box<dyn ChangeSubscription>> {
        let last_seen = latest_seq(&self.pool, &self.name).await?;
        Ok(Box::new(SqliteSubscription {
            channel: self.name.clone(),
            pool: self.pool.clone(),
            last_seen,
        }))
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

struct SqliteSubscription {
    channel: String,
    pool: SqlitePool,
    last_seen: i64,
}

#[async_trait]
impl ChangeSubscription for SqliteSubscription {
    async fn poll(&mut self) -> Result<bool> {
        let latest = latest_seq(&self.pool, &self.channel).await?;
        if latest > self.last_seen {
            self.last_seen = latest;
            return Ok(true);
        }
        Ok(false)
    }
}
