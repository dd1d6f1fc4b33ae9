//! Common error types for the contacts service

use thiserror::Error;

/// Common result type for contacts operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the store, channel and service layers
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// A unique constraint rejected the write
    #[error("Unique constraint violated on {field}")]
    UniqueViolation { field: String },

    /// Change channel transport error
    #[error("Channel error: {0}")]
    Channel(String),

    /// JSON encoding or decoding error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.is_unique_violation() {
                let field = db_err
                    .constraint()
                    .map(constraint_field)
                    .unwrap_or_else(|| unique_violation_field(db_err.message()));
                return Error::UniqueViolation { field };
            }
        }
        Error::Database(err)
    }
}

/// Extract the offending column from a SQLite unique-constraint message
///
/// `"UNIQUE constraint failed: contacts.email"` yields `"email"`. Composite
/// constraints report their first column. Unrecognized messages yield `"field"`.
pub fn unique_violation_field(message: &str) -> String {
    const MARKER: &str = "UNIQUE constraint failed:";

    message
        .find(MARKER)
        .map(|pos| &message[pos + MARKER.len()..])
        .and_then(|columns| columns.split(',').next())
        .and_then(|column| column.trim().rsplit('.').next())
        .filter(|column| !column.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| "field".to_string())
}

/// Derive a column name from a named constraint such as `contacts_email_key`
fn constraint_field(constraint: &str) -> String {
    let trimmed = constraint.strip_suffix("_key").unwrap_or(constraint);
    match trimmed.split_once('_') {
        Some((_table, column)) if !column.is_empty() => column.to_string(),
        _ => trimmed.to_string(),
    }
}

/// Capitalize the first letter of every alphabetic run
///
/// `"email"` becomes `"Email"`, `"first_name"` becomes `"First_Name"`.
pub fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut at_word_start = true;
    for ch in value.chars() {
        if ch.is_alphabetic() {
            if at_word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(ch);
            at_word_start = true;
        }
    }
    out
}
