//! Contact history endpoint

use crate::error::ApiResult;
use crate::AppState;
use axum::{
    extract::{Query, State},
    Json,
};
use contacts_common::db::History;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub contact_id: i64,
}

/// GET /history?contact_id={id} - newest first
pub async fn list_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<Vec<History>>> {
    let history = state.contacts.history(query.contact_id).await?;
    Ok(Json(history))
}
