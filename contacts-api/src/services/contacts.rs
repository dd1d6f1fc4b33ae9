//! Contact operations
//!
//! Each mutation follows the same sequence: commit the write, record a
//! history snapshot (create and effective update only), then publish a change
//! signal. Both post-commit steps are best-effort.

use super::{ChangePublisher, HistoryRecorder};
use contacts_common::db::{contacts, history};
use contacts_common::db::{Contact, ContactFields, History};
use contacts_common::Result;
use sqlx::SqlitePool;
use tracing::info;

#[derive(Clone)]
pub struct ContactService {
    db: SqlitePool,
    recorder: HistoryRecorder,
    publisher: ChangePublisher,
}

impl ContactService {
    pub fn new(db: SqlitePool, recorder: HistoryRecorder, publisher: ChangePublisher) -> Self {
        Self {
            db,
            recorder,
            publisher,
        }
    }

    pub async fn create(&self, fields: &ContactFields) -> Result<Contact> {
        let contact = contacts::insert_contact(&self.db, fields).await?;
        info!("Created contact {}", contact.id);

        self.recorder.record_or_log(&contact).await;
        self.publisher.notify_changed().await;

        Ok(contact)
    }

    pub async fn list(&self) -> Result<Vec<Contact>> {
        contacts::list_contacts(&self.db).await
    }

    pub async fn get(&self, id: i64) -> Result<Contact> {
        contacts::get_contact(&self.db, id).await
    }

    /// Replace all tracked fields; a no-op update records no history
    pub async fn update(&self, id: i64, fields: &ContactFields) -> Result<Contact> {
        let outcome = contacts::update_contact(&self.db, id, fields).await?;

        if outcome.changed {
            info!("Updated contact {}", id);
            self.recorder.record_or_log(&outcome.contact).await;
        }
        self.publisher.notify_changed().await;

        Ok(outcome.contact)
    }

    /// Delete a contact and, by cascade, its history
    pub async fn delete(&self, id: i64) -> Result<()> {
        contacts::delete_contact(&self.db, id).await?;
        info!("Deleted contact {}", id);

        self.publisher.notify_changed().await;

        Ok(())
    }

    pub async fn history(&self, contact_id: i64) -> Result<Vec<History>> {
        history::list_history(&self.db, contact_id).await
    }
}
