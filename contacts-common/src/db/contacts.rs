//! Contact persistence
//!
//! Each function acquires its own connection (or transaction) from the pool;
//! nothing is shared across concurrent requests.

use crate::db::models::{Contact, ContactFields};
use crate::{Error, Result};
use chrono::Utc;
use sqlx::SqlitePool;

const CONTACT_COLUMNS: &str = "id, first_name, last_name, email, phone, created_at";

/// Result of an update: the post-update contact and whether any tracked
/// field actually changed
#[derive(Debug, Clone)]
pub struct UpdateOutcome {
    pub contact: Contact,
    pub changed: bool,
}

fn contact_not_found() -> Error {
    Error::NotFound("Contact not found".to_string())
}

/// Insert a new contact
///
/// A duplicate email surfaces as [`Error::UniqueViolation`].
pub async fn insert_contact(pool: &SqlitePool, fields: &ContactFields) -> Result<Contact> {
    let contact = sqlx::query_as::<_, Contact>(&format!(
        r#"
        INSERT INTO contacts (first_name, last_name, email, phone, created_at)
        VALUES (?, ?, ?, ?, ?)
        RETURNING {}
        "#,
        CONTACT_COLUMNS
    ))
    .bind(&fields.first_name)
    .bind(&fields.last_name)
    .bind(&fields.email)
    .bind(&fields.phone)
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;

    Ok(contact)
}

/// All contacts, newest first
pub async fn list_contacts(pool: &SqlitePool) -> Result<Vec<Contact>> {
    let contacts = sqlx::query_as::<_, Contact>(&format!(
        "SELECT {} FROM contacts ORDER BY created_at DESC, id DESC",
        CONTACT_COLUMNS
    ))
    .fetch_all(pool)
    .await?;

    Ok(contacts)
}

/// Load contact by id
pub async fn load_contact(pool: &SqlitePool, id: i64) -> Result<Option<Contact>> {
    let contact = sqlx::query_as::<_, Contact>(&format!(
        "SELECT {} FROM contacts WHERE id = ?",
        CONTACT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(contact)
}

/// Load contact by id, failing with [`Error::NotFound`] when absent
pub async fn get_contact(pool: &SqlitePool, id: i64) -> Result<Contact> {
    load_contact(pool, id).await?.ok_or_else(contact_not_found)
}

/// Replace all tracked fields of a contact
///
/// The stored values are compared field-by-field against `fields` inside the
/// same transaction as the write, so `changed` reflects exactly what this
/// update did.
pub async fn update_contact(
    pool: &SqlitePool,
    id: i64,
    fields: &ContactFields,
) -> Result<UpdateOutcome> {
    let mut tx = pool.begin().await?;

    let existing = sqlx::query_as::<_, Contact>(&format!(
        "SELECT {} FROM contacts WHERE id = ?",
        CONTACT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(contact_not_found)?;

    if existing.fields() == *fields {
        tx.commit().await?;
        return Ok(UpdateOutcome {
            contact: existing,
            changed: false,
        });
    }

    let contact = sqlx::query_as::<_, Contact>(&format!(
        r#"
        UPDATE contacts
        SET first_name = ?, last_name = ?, email = ?, phone = ?
        WHERE id = ?
        RETURNING {}
        "#,
        CONTACT_COLUMNS
    ))
    .bind(&fields.first_name)
    .bind(&fields.last_name)
    .bind(&fields.email)
    .bind(&fields.phone)
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(UpdateOutcome {
        contact,
        changed: true,
    })
}

/// Delete a contact; its history rows cascade
pub async fn delete_contact(pool: &SqlitePool, id: i64) -> Result<()> {
    let result = sqlx::query("DELETE FROM contacts WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(contact_not_found());
    }

    Ok(())
}
