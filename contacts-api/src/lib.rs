//! contacts-api library - Contacts service
//!
//! CRUD over contacts with an append-only history log, and live
//! contact-list updates pushed to connected clients whenever any API
//! instance changes the data.

use axum::Router;
use contacts_common::channel::ChangeChannel;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod error;
pub mod live;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use live::SubscriberRegistry;
use services::{ChangePublisher, ContactService, HistoryRecorder};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Record store connection pool
    pub db: SqlitePool,
    /// Contact operations with history recording and change publishing
    pub contacts: ContactService,
    /// Connected live-update subscribers
    pub registry: Arc<SubscriberRegistry>,
    /// Cancelled at process shutdown; ends live streams
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Wire the service layer over a pool and an injected change channel
    pub fn new(
        db: SqlitePool,
        channel: Arc<dyn ChangeChannel>,
        registry: Arc<SubscriberRegistry>,
        shutdown: CancellationToken,
    ) -> Self {
        let contacts = ContactService::new(
            db.clone(),
            HistoryRecorder::new(db.clone()),
            ChangePublisher::new(channel),
        );
        Self {
            db,
            contacts,
            registry,
            shutdown,
        }
    }
}

/// Build application router
///
/// Contact, history and live routes are nested under `api_prefix` when one
/// is given; `/` and `/health` always stay at the root.
pub fn build_router(state: AppState, api_prefix: Option<&str>) -> Router {
    use axum::routing::get;

    let contact_routes = Router::new()
        .route(
            "/contacts",
            get(api::list_contacts).post(api::create_contact),
        )
        .route("/contacts/events", get(api::live_updates))
        .route(
            "/contacts/:id",
            get(api::get_contact)
                .put(api::update_contact)
                .delete(api::delete_contact),
        )
        .route("/history", get(api::list_history));

    let routes = match api_prefix {
        Some(prefix) => Router::new().nest(prefix, contact_routes),
        None => contact_routes,
    };

    routes
        .merge(api::health_routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
