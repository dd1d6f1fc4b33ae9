//! Record store: schema, models and queries

pub mod contacts;
pub mod history;
pub mod init;
pub mod models;

pub use init::*;
pub use models::*;
