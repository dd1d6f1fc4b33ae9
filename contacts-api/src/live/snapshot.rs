//! Full contact-list payload pushed to live subscribers

use contacts_common::db::contacts::list_contacts;
use contacts_common::db::Contact;
use contacts_common::Result;
use sqlx::SqlitePool;
use std::sync::Arc;

/// Serialized contact list shared by every subscriber of one broadcast
pub type Snapshot = Arc<str>;

/// Serialize contacts as a JSON array with every stored column
pub fn encode_snapshot(contacts: &[Contact]) -> Result<Snapshot> {
    Ok(Arc::from(serde_json::to_string(contacts)?))
}

/// Re-read the full contact list (newest first) and serialize it
pub async fn current_snapshot(db: &SqlitePool) -> Result<Snapshot> {
    let contacts = list_contacts(db).await?;
    encode_snapshot(&contacts)
}
