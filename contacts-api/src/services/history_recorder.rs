//! History recorder
//!
//! Writes an immutable snapshot row after a contact mutation commits.
//! Recording is isolated from the mutation: a failed snapshot is logged and
//! never fails or rolls back the write that triggered it.

use contacts_common::db::history::insert_history;
use contacts_common::db::{Contact, History};
use contacts_common::Result;
use sqlx::SqlitePool;
use tracing::{debug, error};

#[derive(Clone)]
pub struct HistoryRecorder {
    db: SqlitePool,
}

impl HistoryRecorder {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Store the full current state of `contact` as a history row
    pub async fn record_snapshot(&self, contact: &Contact) -> Result<History> {
        let history = insert_history(&self.db, contact.id, &contact.snapshot()).await?;
        debug!("Recorded history {} for contact {}", history.id, contact.id);
        Ok(history)
    }

    /// [`record_snapshot`](Self::record_snapshot), logging instead of returning errors
    pub async fn record_or_log(&self, contact: &Contact) -> Option<History> {
        match self.record_snapshot(contact).await {
            Ok(history) => Some(history),
            Err(e) => {
                error!("Error saving contact history for contact ID {}: {}", contact.id, e);
                None
            }
        }
    }
}
