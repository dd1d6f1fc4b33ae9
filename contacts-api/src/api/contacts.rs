//! Contact CRUD endpoints

use crate::error::ApiResult;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use contacts_common::db::{Contact, ContactFields};
use serde::{Deserialize, Serialize};

/// Contact as returned by the CRUD endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactResponse {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
}

impl From<Contact> for ContactResponse {
    fn from(contact: Contact) -> Self {
        Self {
            id: contact.id,
            first_name: contact.first_name,
            last_name: contact.last_name,
            email: contact.email,
            phone: contact.phone,
        }
    }
}

/// POST /contacts
pub async fn create_contact(
    State(state): State<AppState>,
    Json(fields): Json<ContactFields>,
) -> ApiResult<Json<ContactResponse>> {
    let contact = state.contacts.create(&fields).await?;
    Ok(Json(contact.into()))
}

/// GET /contacts - newest first
pub async fn list_contacts(State(state): State<AppState>) -> ApiResult<Json<Vec<ContactResponse>>> {
    let contacts = state.contacts.list().await?;
    Ok(Json(contacts.into_iter().map(ContactResponse::from).collect()))
}

/// GET /contacts/:id
pub async fn get_contact(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ContactResponse>> {
    let contact = state.contacts.get(id).await?;
    Ok(Json(contact.into()))
}

/// PUT /contacts/:id - replaces all four fields
pub async fn update_contact(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(fields): Json<ContactFields>,
) -> ApiResult<Json<ContactResponse>> {
    let contact = state.contacts.update(id, &fields).await?;
    Ok(Json(contact.into()))
}

/// DELETE /contacts/:id
pub async fn delete_contact(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    state.contacts.delete(id).await?;
    Ok(StatusCode::OK)
}
