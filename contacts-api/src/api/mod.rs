//! HTTP API handlers for contacts-api

pub mod contacts;
pub mod health;
pub mod history;
pub mod live;

pub use contacts::{
    create_contact, delete_contact, get_contact, list_contacts, update_contact, ContactResponse,
};
pub use health::health_routes;
pub use history::list_history;
pub use live::live_updates;
