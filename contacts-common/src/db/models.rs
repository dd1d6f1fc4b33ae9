//! Record store models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The four tracked contact fields
///
/// Doubles as the create/update request body; two values are equal when
/// every tracked field is equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactFields {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
}

/// Stored contact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Contact {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
}

impl Contact {
    /// Current values of the tracked fields
    pub fn fields(&self) -> ContactFields {
        ContactFields {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
        }
    }

    /// Point-in-time copy stored in a history row
    pub fn snapshot(&self) -> HistorySnapshot {
        HistorySnapshot {
            first_name: Some(self.first_name.clone()),
            last_name: Some(self.last_name.clone()),
            email: Some(self.email.clone()),
            phone: Some(self.phone.clone()),
        }
    }
}

/// Snapshot payload of a history row
///
/// Fields are optional: rows written before a field existed decode with `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistorySnapshot {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Immutable history row
///
/// Serializes flat as `{id, first_name, last_name, email, phone, created_at}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct History {
    pub id: i64,
    #[serde(skip_serializing)]
    pub contact_id: i64,
    #[serde(flatten)]
    pub snapshot: HistorySnapshot,
    pub created_at: DateTime<Utc>,
}
